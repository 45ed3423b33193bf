use serde::{Deserialize, Serialize};

/// Characters of a source link that precede the document name.
const LINK_PREFIX_CHARS: usize = 40;
/// Characters of a source link that follow the document name (file extension).
const LINK_SUFFIX_CHARS: usize = 4;

/// A ranked passage returned by the retrieval adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    #[serde(rename = "Document")]
    pub document_name: String,
    #[serde(rename = "Source")]
    pub source_link: String,
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Score")]
    pub score: f32,
}

impl RetrievedPassage {
    pub fn new(text: impl Into<String>, source_link: impl Into<String>, score: f32) -> Self {
        let source_link = source_link.into();
        Self {
            text: text.into(),
            document_name: document_name(&source_link),
            source_link,
            score,
        }
    }
}

/// Derive a document name from its source link by dropping the fixed-width
/// host/folder prefix and the extension. Links too short for both yield "".
pub fn document_name(link: &str) -> String {
    let len = link.chars().count();
    let end = len.saturating_sub(LINK_SUFFIX_CHARS);
    if LINK_PREFIX_CHARS >= end {
        return String::new();
    }
    link.chars()
        .skip(LINK_PREFIX_CHARS)
        .take(end - LINK_PREFIX_CHARS)
        .collect()
}

fn default_top_k() -> usize {
    crate::error::MIN_TOP_K
}

fn default_language() -> String {
    "en".to_string()
}

/// Search request
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// Search response
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub passages: Vec<RetrievedPassage>,
}

/// Summary request
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Language of the query and of the translated summary
    #[serde(default = "default_language")]
    pub language: String,
}

/// A single chat turn sent to the completion API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Translate request
#[derive(Debug, Clone, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    #[serde(default = "default_language")]
    pub source: String,
    pub target: String,
}

/// Translate response
#[derive(Debug, Clone, Serialize)]
pub struct TranslateResponse {
    pub text: String,
}

/// Speech request
#[derive(Debug, Clone, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_name_strips_prefix_and_extension() {
        let link = "https://raw.githubusercontent.com/agri/d/Cotton_Pink_Bollworm.pdf";
        assert_eq!(link.chars().take(40).count(), 40);
        let name = document_name(link);
        assert_eq!(name, &link[40..link.len() - 4]);
        assert!(!name.ends_with(".pdf"));
    }

    #[test]
    fn test_document_name_short_link_is_empty() {
        assert_eq!(document_name("https://example.com/a.pdf"), "");
        assert_eq!(document_name(""), "");
    }

    #[test]
    fn test_passage_serializes_with_display_keys() {
        let passage = RetrievedPassage::new("text", "link", 0.5);
        let json = serde_json::to_value(&passage).unwrap();
        assert_eq!(json["Text"], "text");
        assert_eq!(json["Source"], "link");
        assert_eq!(json["Document"], "");
        assert_eq!(json["Score"], 0.5);
    }

    #[test]
    fn test_passage_keys_in_display_order() {
        let passage = RetrievedPassage::new("text", "link", 0.5);
        let json = serde_json::to_string(&passage).unwrap();
        let at = |key: &str| json.find(&format!("\"{key}\"")).unwrap();
        assert!(at("Document") < at("Source"));
        assert!(at("Source") < at("Text"));
        assert!(at("Text") < at("Score"));
    }

    #[test]
    fn test_summary_request_defaults() {
        let req: SummaryRequest = serde_json::from_str(r#"{"query":"thrips"}"#).unwrap();
        assert_eq!(req.top_k, 3);
        assert_eq!(req.language, "en");
    }
}
