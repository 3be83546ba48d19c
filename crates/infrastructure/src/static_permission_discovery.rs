
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use rbacsync_application::PermissionDiscovery;
use rbacsync_core::{AppError, AppResult};
use rbacsync_domain::{DiscoveredPermission, normalize_action_name, normalize_category_name};

#[derive(Debug, Clone, Default, Deserialize)]
struct ActionManifest {
    #[serde(default)]
    controllers: BTreeMap<String, Vec<String>>,
}

/// Discovery provider reading the action surface from a manifest.
///
/// The manifest maps controller names to action references:
/// `{"controllers": {"User": ["actionEdit", "View"]}}`.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissionDiscovery {
    manifest: ActionManifest,
}

impl StaticPermissionDiscovery {
    /// Parses a manifest from JSON text.
    pub fn from_json(content: &str) -> AppResult<Self> {
        let manifest = serde_json::from_str::<ActionManifest>(content).map_err(|error| {
            AppError::Validation(format!("invalid action manifest: {error}"))
        })?;

        Ok(Self { manifest })
    }

    /// Reads a manifest file; a missing file yields an empty action surface.
    pub async fn from_file(path: &Path) -> AppResult<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Self::from_json(content.as_str()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(AppError::Internal(format!(
                "failed to read action manifest '{}': {error}",
                path.display()
            ))),
        }
    }
}

#[async_trait]
impl PermissionDiscovery for StaticPermissionDiscovery {
    async fn discover(&self) -> AppResult<Vec<DiscoveredPermission>> {
        let mut seen = HashSet::new();
        let mut permissions = Vec::new();

        for (controller, actions) in &self.manifest.controllers {
            let category = normalize_category_name(controller);
            for action in actions {
                let action = normalize_action_name(action);
                if action.is_empty() {
                    continue;
                }

                let permission = DiscoveredPermission::from_action(&category, &action);
                if seen.insert(permission.name.clone()) {
                    permissions.push(permission);
                }
            }
        }

        Ok(permissions)
    }
}
