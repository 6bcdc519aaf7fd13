//! Knowledge store: embedded API documentation with similarity search.
//!
//! Documents are embedded on insert and ranked against an embedded query on
//! search. Ranking is a linear cosine-similarity scan over the corpus, which
//! is fine at documentation scale and has no index to keep in sync.

mod memory;
mod similarity;
mod sqlite;
mod store;

pub use memory::InMemoryDocumentStore;
pub use similarity::{cosine_similarity, rank};
pub use sqlite::SqliteDocumentStore;
pub use store::{DocumentStore, Scan};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::embedding::{Embedder, EmbeddingError};

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Failed to generate vector: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;

/// A documentation entry as submitted, before it is embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    /// Endpoint or topic name
    pub name: String,

    /// Text that gets embedded and matched against queries
    pub description: String,

    /// Optional auxiliary key-value data (parameters, headers, ...)
    #[serde(default)]
    pub data: Option<Map<String, Value>>,

    /// Canonical example response
    #[serde(default)]
    pub response: Value,
}

/// A stored documentation entry with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub response: Value,
    /// Empty when the record was stored without a vector
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Model the vector came from (empty when unknown)
    #[serde(default)]
    pub embedding_model: String,
}

/// Embeds, persists and ranks documentation entries.
#[derive(Clone)]
pub struct KnowledgeStore {
    documents: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
}

impl KnowledgeStore {
    pub fn new(documents: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            documents,
            embedder,
        }
    }

    /// Model every stored and queried vector is expected to come from.
    pub fn embedding_model(&self) -> &str {
        self.embedder.model()
    }

    /// Embed the description and persist the document. Returns the storage id.
    pub async fn insert(&self, document: NewDocument) -> KnowledgeResult<String> {
        let embedding = self.embedder.embed(&document.description).await?;

        let entry = DocumentEntry {
            id: Uuid::new_v4().to_string(),
            name: document.name,
            description: document.description,
            data: document.data,
            response: document.response,
            embedding,
            embedding_model: self.embedder.model().to_string(),
        };

        let id = self.documents.insert(entry).await?;
        tracing::info!("Inserted API doc {} into {} store", id, self.backend_label());
        Ok(id)
    }

    /// Return up to `top_n` entries most similar to `query`, best first.
    pub async fn search(&self, query: &str, top_n: usize) -> KnowledgeResult<Vec<DocumentEntry>> {
        if top_n == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let scan = self.documents.scan().await?;
        if let Some(error) = &scan.error {
            tracing::warn!(
                "Partial corpus read ({} entries before failure): {}",
                scan.entries.len(),
                error
            );
        }

        let pinned = self.embedder.model();
        let mut scored = Vec::with_capacity(scan.entries.len());
        for entry in scan.entries {
            if entry.embedding.is_empty() {
                continue;
            }
            if !entry.embedding_model.is_empty() && entry.embedding_model != pinned {
                tracing::warn!(
                    "Skipping doc {}: embedded with {} but searching with {}",
                    entry.id,
                    entry.embedding_model,
                    pinned
                );
                continue;
            }
            match cosine_similarity(&query_vector, &entry.embedding) {
                Some(score) => scored.push((entry, score)),
                None => tracing::warn!(
                    "Skipping doc {}: similarity undefined ({} vs {} dims)",
                    entry.id,
                    entry.embedding.len(),
                    query_vector.len()
                ),
            }
        }

        let ranked = rank(scored, top_n);
        tracing::debug!(
            "Search '{}' matched {} docs (top score {:?})",
            query,
            ranked.len(),
            ranked.first().map(|(_, s)| *s)
        );
        Ok(ranked.into_iter().map(|(entry, _)| entry).collect())
    }

    fn backend_label(&self) -> &'static str {
        if self.documents.is_persistent() {
            "persistent"
        } else {
            "in-memory"
        }
    }
}
