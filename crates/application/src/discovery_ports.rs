use async_trait::async_trait;

use rbacsync_core::AppResult;
use rbacsync_domain::DiscoveredPermission;

/// Port supplying permissions derived from the host action surface.
#[async_trait]
pub trait PermissionDiscovery: Send + Sync {
    /// Returns candidates in a stable order with unique names.
    async fn discover(&self) -> AppResult<Vec<DiscoveredPermission>>;
}
