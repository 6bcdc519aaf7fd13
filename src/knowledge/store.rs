//! Persistence seam for documentation entries.

use async_trait::async_trait;

use super::{DocumentEntry, KnowledgeResult};

/// Result of reading the whole corpus.
///
/// A backend that fails partway through returns what it already read plus
/// the failure, so ranking can proceed on a partial corpus.
#[derive(Debug, Default)]
pub struct Scan {
    pub entries: Vec<DocumentEntry>,
    pub error: Option<String>,
}

impl Scan {
    pub fn complete(entries: Vec<DocumentEntry>) -> Self {
        Self {
            entries,
            error: None,
        }
    }
}

/// Durable storage for embedded documents. Records are immutable once written.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether records survive a restart.
    fn is_persistent(&self) -> bool;

    /// Persist one entry and return its storage id.
    async fn insert(&self, entry: DocumentEntry) -> KnowledgeResult<String>;

    /// Read every stored entry in insertion order.
    async fn scan(&self) -> KnowledgeResult<Scan>;
}
