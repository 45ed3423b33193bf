//! Retrieval adapter: query text in, ranked passages out.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::{validate_top_k, PipelineError};
use crate::llm::embeddings::Embedder;
use crate::models::RetrievedPassage;
use crate::search::vector::VectorStore;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `top_k` passages, most similar first.
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>>;
}

/// Embeds the query through a hosted model and ranks the prebuilt index by cosine similarity.
pub struct EmbeddingRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
}

impl EmbeddingRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<VectorStore>) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl Retriever for EmbeddingRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        let top_k = validate_top_k(top_k)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::EmptyQuery.into());
        }

        let embedding = self.embedder.embed(query).await?;
        let passages = self.store.search(&embedding, top_k);
        tracing::info!("Retrieved {} passages for {query:?}", passages.len());
        Ok(passages)
    }
}
