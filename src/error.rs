use thiserror::Error;

/// Smallest and largest number of passages a caller may ask for.
pub const MIN_TOP_K: usize = 3;
pub const MAX_TOP_K: usize = 5;

/// Request preconditions the HTTP layer maps to client errors.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("Query is required")]
    EmptyQuery,

    #[error("top_k must be between {MIN_TOP_K} and {MAX_TOP_K}, got {0}")]
    InvalidTopK(usize),

    #[error("Summary needs at least {needed} passages, only {found} retrieved")]
    InsufficientPassages { needed: usize, found: usize },

    #[error("Speech synthesis is not configured")]
    SpeechNotConfigured,
}

pub fn validate_top_k(top_k: usize) -> Result<usize, PipelineError> {
    if (MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
        Ok(top_k)
    } else {
        Err(PipelineError::InvalidTopK(top_k))
    }
}
