#[cfg(test)]
mod tests;

use std::sync::Arc;

use rbacsync_core::AppResult;
use rbacsync_domain::Locale;

use crate::change_report::{ImportReport, SyncReport};
use crate::discovery_ports::PermissionDiscovery;
use crate::document_ports::DocumentStore;
use crate::exporter::{ExportReport, Exporter};
use crate::graph_ports::{GraphStore, GraphTransaction};
use crate::importer::Importer;
use crate::reconciler::{Reconciler, SyncDefinition, SyncRequest};
use crate::transaction_scope::TransactionScope;

/// Options of one `init` run.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Declared desired state.
    pub definition: SyncDefinition,
    /// Clears every collection before synchronizing.
    pub reset: bool,
    /// Deletes stored permissions that are no longer candidates.
    pub delete_obsolete_permissions: bool,
}

/// Application service coordinating init, export and import.
///
/// Init and import run inside one graph transaction each and are rolled
/// back as a whole on the first error.
#[derive(Clone)]
pub struct RbacAdminService {
    graph_store: Arc<dyn GraphStore>,
    discovery: Arc<dyn PermissionDiscovery>,
    reconciler: Reconciler,
    exporter: Exporter,
    importer: Importer,
}

impl RbacAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        graph_store: Arc<dyn GraphStore>,
        document_store: Arc<dyn DocumentStore>,
        discovery: Arc<dyn PermissionDiscovery>,
        admin_user_id: impl Into<String>,
    ) -> Self {
        let admin_user_id = admin_user_id.into();

        Self {
            exporter: Exporter::new(graph_store.clone(), document_store.clone()),
            importer: Importer::new(document_store, admin_user_id.clone()),
            reconciler: Reconciler::new(admin_user_id),
            graph_store,
            discovery,
        }
    }

    /// Synchronizes discovered and declared items into the graph.
    pub async fn init(&self, options: InitOptions) -> AppResult<SyncReport> {
        let discovered = self.discovery.discover().await?;
        let request = SyncRequest {
            definition: options.definition,
            discovered,
            delete_obsolete_permissions: options.delete_obsolete_permissions,
        };

        let mut scope = TransactionScope::begin(self.graph_store.as_ref()).await?;
        let outcome = self
            .run_init(scope.transaction(), options.reset, request)
            .await;
        scope.complete(outcome).await
    }

    /// Writes the graph to documents for the configured locales.
    pub async fn export(&self, locales: &[Locale]) -> AppResult<ExportReport> {
        self.exporter.export(locales).await
    }

    /// Replays the documents of one locale into the graph.
    pub async fn import(&self, locale: &Locale) -> AppResult<ImportReport> {
        let mut scope = TransactionScope::begin(self.graph_store.as_ref()).await?;
        let outcome = self.importer.import(scope.transaction(), locale).await;
        scope.complete(outcome).await
    }

    async fn run_init(
        &self,
        transaction: &mut dyn GraphTransaction,
        reset: bool,
        request: SyncRequest,
    ) -> AppResult<SyncReport> {
        if reset {
            transaction.clear_all().await?;
        }

        self.reconciler.synchronize(transaction, request).await
    }
}
