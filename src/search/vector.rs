use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::models::RetrievedPassage;

/// A stored passage with its precomputed embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: Uuid,
    pub text: String,
    /// Source document link
    pub link: String,
    pub embedding: Vec<f32>,
}

/// A passage to add to the index. The embedding is supplied separately.
#[derive(Debug, Clone)]
pub struct NewPassage {
    pub text: String,
    pub link: String,
}

/// In-memory passage index with disk persistence and cosine similarity search.
pub struct VectorStore {
    entries: RwLock<Vec<IndexEntry>>,
    persist_path: PathBuf,
}

impl VectorStore {
    /// Load a prebuilt index. Fails when the directory has no `vectors.json`.
    pub fn open(index_dir: &Path) -> Result<Self> {
        let persist_path = index_dir.join("vectors.json");

        let data = std::fs::read_to_string(&persist_path)
            .with_context(|| format!("Failed to read index at {}", persist_path.display()))?;
        let entries: Vec<IndexEntry> =
            serde_json::from_str(&data).context("Failed to parse index entries")?;

        tracing::info!(
            "Loaded {} passages from {}",
            entries.len(),
            persist_path.display()
        );

        Ok(Self {
            entries: RwLock::new(entries),
            persist_path,
        })
    }

    /// Create an empty index in `index_dir`, overwriting nothing until the first add.
    pub fn create(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;
        Ok(Self {
            entries: RwLock::new(Vec::new()),
            persist_path: index_dir.join("vectors.json"),
        })
    }

    /// Add passages. `embeddings` must be parallel with `passages`.
    pub fn add_passages(&self, passages: &[NewPassage], embeddings: Vec<Vec<f32>>) -> Result<()> {
        if passages.len() != embeddings.len() {
            anyhow::bail!(
                "Got {} embeddings for {} passages",
                embeddings.len(),
                passages.len()
            );
        }

        let mut entries = self.entries.write();
        let mut updated = (*entries).clone();
        for (passage, embedding) in passages.iter().zip(embeddings) {
            updated.push(IndexEntry {
                id: Uuid::new_v4(),
                text: passage.text.clone(),
                link: passage.link.clone(),
                embedding,
            });
        }

        // Persist via temp file + rename before the in-memory entries change
        let data = serde_json::to_string(&updated)?;
        let tmp_path = self.persist_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.persist_path)
            .with_context(|| format!("Failed to replace {}", self.persist_path.display()))?;
        *entries = updated;

        Ok(())
    }

    /// Search by cosine similarity against a query embedding.
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> Vec<RetrievedPassage> {
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &IndexEntry)> = entries
            .iter()
            .map(|e| (cosine_similarity(query_embedding, &e.embedding), e))
            .collect();

        // Sort descending by score
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(score, e)| RetrievedPassage::new(e.text.clone(), e.link.clone(), score))
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
