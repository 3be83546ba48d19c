
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use rbacsync_application::{Document, DocumentKey, DocumentStore, Record};
use rbacsync_core::{AppError, AppResult};

/// Document store keeping each document as `<directory>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileDocumentStore {
    directory: PathBuf,
}

impl JsonFileDocumentStore {
    /// Creates a store rooted at the given directory.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.directory.as_path()
    }

    fn path_for(&self, key: &DocumentKey) -> PathBuf {
        self.directory.join(format!("{}.json", key.as_key()))
    }
}

#[async_trait]
impl DocumentStore for JsonFileDocumentStore {
    async fn load(&self, key: &DocumentKey) -> AppResult<Option<Document>> {
        let path = self.path_for(key);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read '{}': {error}",
                    path.display()
                )));
            }
        };

        let records = serde_json::from_slice::<Vec<Record>>(&content)
            .map_err(|error| AppError::malformed_document(key.as_key(), error.to_string()))?;

        Ok(Some(Document::new(records)))
    }

    async fn save(&self, key: &DocumentKey, document: &Document) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to create '{}': {error}",
                    self.directory.display()
                ))
            })?;

        let mut content = serde_json::to_vec_pretty(document.records()).map_err(|error| {
            AppError::Internal(format!("failed to serialize document '{key}': {error}"))
        })?;
        content.push(b'\n');

        let path = self.path_for(key);
        tokio::fs::write(&path, content).await.map_err(|error| {
            AppError::Internal(format!("failed to write '{}': {error}", path.display()))
        })?;

        debug!(path = %path.display(), records = document.len(), "document written");
        Ok(())
    }

    async fn list_keys(&self) -> AppResult<Vec<DocumentKey>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to list '{}': {error}",
                    self.directory.display()
                )));
            }
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to list '{}': {error}",
                self.directory.display()
            ))
        })? {
            let file_name = entry.file_name();
            if let Some(key) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(".json"))
                .and_then(DocumentKey::parse)
            {
                keys.push(key);
            }
        }
        keys.sort();

        Ok(keys)
    }
}
