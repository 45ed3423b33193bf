use std::sync::Arc;

use crate::config::Config;
use crate::llm::chat_stream::{ChatBackend, LlmChat};
use crate::llm::embeddings::LlmEmbedder;
use crate::retrieval::{EmbeddingRetriever, Retriever};
use crate::search::vector::VectorStore;
use crate::services::speech::{DisabledSpeech, GoogleSpeech, SpeechSynthesizer};
use crate::services::translate::{GoogleTranslator, NoopTranslator, Translator};
use crate::summary::links::{KeywordLinkTable, LinkStyle};

/// Maximum summaries streaming at once.
const MAX_CONCURRENT_SUMMARIES: usize = 3;

/// Shared application state: the service handles every request works with.
#[derive(Clone)]
pub struct AppState {
    pub retriever: Arc<dyn Retriever>,
    pub chat: Arc<dyn ChatBackend>,
    pub translator: Arc<dyn Translator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub links: Arc<KeywordLinkTable>,
    pub link_style: LinkStyle,
    pub summary_semaphore: Arc<tokio::sync::Semaphore>,
}

/// Hand-assembled service set, used when the hosted defaults are not wanted.
pub struct Services {
    pub retriever: Arc<dyn Retriever>,
    pub chat: Arc<dyn ChatBackend>,
    pub translator: Arc<dyn Translator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub links: KeywordLinkTable,
    pub link_style: LinkStyle,
}

impl AppState {
    /// Build hosted service clients from config. Fails when the index cannot be loaded.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let store = Arc::new(VectorStore::open(&config.index_dir)?);

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let embedder = Arc::new(LlmEmbedder::new(http_client.clone(), config.llm.clone()));
        let retriever = Arc::new(EmbeddingRetriever::new(embedder, store));
        let chat = Arc::new(LlmChat::new(http_client.clone(), config.llm.clone()));

        let (translator, speech): (Arc<dyn Translator>, Arc<dyn SpeechSynthesizer>) =
            match config.google.api_key.as_deref() {
                Some(key) => (
                    Arc::new(GoogleTranslator::new(
                        http_client.clone(),
                        &config.google.translate_base_url,
                        key,
                    )),
                    Arc::new(GoogleSpeech::new(
                        http_client,
                        &config.google.tts_base_url,
                        key,
                    )),
                ),
                None => {
                    tracing::warn!("GOOGLE_API_KEY not set; translation and speech are disabled");
                    (Arc::new(NoopTranslator), Arc::new(DisabledSpeech))
                }
            };

        let links = match &config.links_file {
            Some(path) => KeywordLinkTable::from_file(path)?,
            None => KeywordLinkTable::builtin(),
        };
        tracing::info!("Keyword link table has {} phrases", links.len());

        Ok(Self::from_services(Services {
            retriever,
            chat,
            translator,
            speech,
            links,
            link_style: config.link_style,
        }))
    }

    pub fn from_services(services: Services) -> Self {
        Self {
            retriever: services.retriever,
            chat: services.chat,
            translator: services.translator,
            speech: services.speech,
            links: Arc::new(services.links),
            link_style: services.link_style,
            summary_semaphore: Arc::new(tokio::sync::Semaphore::new(MAX_CONCURRENT_SUMMARIES)),
        }
    }
}
