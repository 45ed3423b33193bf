use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::summary::links::LinkStyle;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the prebuilt passage index (`vectors.json`)
    pub index_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// Optional JSON file replacing the built-in keyword link table
    pub links_file: Option<PathBuf>,
    /// How keyword links are rendered into the summary
    pub link_style: LinkStyle,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Google Cloud translation / text-to-speech configuration
    pub google: GoogleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for the streamed summary
    pub chat_model: String,
    /// Model name for query embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
}

/// Hosted translation and speech endpoints. Both are disabled without an API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub api_key: Option<String>,
    pub translate_base_url: String,
    pub tts_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("./vector_store"),
            bind_addr: "127.0.0.1:9000".to_string(),
            links_file: None,
            link_style: LinkStyle::Markdown,
            llm: LlmConfig::default(),
            google: GoogleConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4-1106-preview".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            api_key: None,
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            translate_base_url: "https://translation.googleapis.com".to_string(),
            tts_base_url: "https://texttospeech.googleapis.com".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup` (an environment variable reader) to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("CROP_SEARCH_INDEX_DIR") {
            config.index_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("CROP_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(path) = lookup("CROP_SEARCH_LINKS_FILE") {
            config.links_file = Some(PathBuf::from(path));
        }
        if let Some(style) = lookup("CROP_SEARCH_LINK_STYLE") {
            match style.parse() {
                Ok(s) => config.link_style = s,
                Err(e) => tracing::warn!("Ignoring CROP_SEARCH_LINK_STYLE: {e}"),
            }
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Some(model) = lookup("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Some(model) = lookup("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        // LLM_API_KEY wins over the conventional OpenAI variable
        config.llm.api_key = lookup("LLM_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));

        config.google.api_key = lookup("GOOGLE_API_KEY").filter(|key| !key.trim().is_empty());
        if let Some(url) = lookup("GOOGLE_TRANSLATE_BASE_URL") {
            config.google.translate_base_url = url;
        }
        if let Some(url) = lookup("GOOGLE_TTS_BASE_URL") {
            config.google.tts_base_url = url;
        }

        config
    }
}
