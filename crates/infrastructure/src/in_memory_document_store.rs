use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use rbacsync_application::{Document, DocumentKey, DocumentStore};
use rbacsync_core::AppResult;

/// In-memory document store implementation.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<DocumentKey, Document>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn load(&self, key: &DocumentKey) -> AppResult<Option<Document>> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn save(&self, key: &DocumentKey, document: &Document) -> AppResult<()> {
        self.documents
            .write()
            .await
            .insert(key.clone(), document.clone());
        Ok(())
    }

    async fn list_keys(&self) -> AppResult<Vec<DocumentKey>> {
        Ok(self.documents.read().await.keys().cloned().collect())
    }
}
