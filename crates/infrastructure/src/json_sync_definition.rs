use std::path::Path;

use rbacsync_application::SyncDefinition;
use rbacsync_core::{AppError, AppResult};

/// Parses the desired-state definition from JSON text.
pub fn parse_sync_definition(content: &str) -> AppResult<SyncDefinition> {
    serde_json::from_str::<SyncDefinition>(content).map_err(|error| {
        AppError::MalformedDefinition(format!("invalid definition file: {error}"))
    })
}

/// Reads the desired-state definition file.
pub async fn load_sync_definition(path: &Path) -> AppResult<SyncDefinition> {
    let content = tokio::fs::read_to_string(path).await.map_err(|error| {
        if error.kind() == std::io::ErrorKind::NotFound {
            AppError::NotFound(format!("definition file '{}' does not exist", path.display()))
        } else {
            AppError::Internal(format!(
                "failed to read definition file '{}': {error}",
                path.display()
            ))
        }
    })?;

    parse_sync_definition(content.as_str())
}
