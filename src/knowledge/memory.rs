//! In-memory document store (non-persistent).

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentEntry, DocumentStore, KnowledgeResult, Scan};

#[derive(Default)]
pub struct InMemoryDocumentStore {
    entries: RwLock<Vec<DocumentEntry>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn insert(&self, entry: DocumentEntry) -> KnowledgeResult<String> {
        let id = entry.id.clone();
        self.entries.write().await.push(entry);
        Ok(id)
    }

    async fn scan(&self) -> KnowledgeResult<Scan> {
        Ok(Scan::complete(self.entries.read().await.clone()))
    }
}
