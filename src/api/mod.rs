pub mod search;
pub mod speech;
pub mod summary;

use axum::http::StatusCode;

use crate::error::PipelineError;

pub type ApiError = (StatusCode, String);

/// Map a pipeline failure to an HTTP status, prefixing the message with `what`.
pub fn api_error(what: &str, err: anyhow::Error) -> ApiError {
    let status = match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::EmptyQuery) | Some(PipelineError::InvalidTopK(_)) => {
            StatusCode::BAD_REQUEST
        }
        Some(PipelineError::InsufficientPassages { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(PipelineError::SpeechNotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("{what}: {err:#}");
    }
    (status, format!("{what}: {err}"))
}
