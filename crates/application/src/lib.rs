//! Application services and ports.

#![forbid(unsafe_code)]

mod change_report;
mod discovery_ports;
mod document_ports;
mod exporter;
mod graph_ports;
mod importer;
mod rbac_admin_service;
mod reconciler;
mod transaction_scope;

#[cfg(test)]
mod test_support;

pub use change_report::{
    ChangeAction, ChangeReport, ChangeSubject, GraphChange, ImportReport, SyncReport, SyncWarning,
};
pub use discovery_ports::PermissionDiscovery;
pub use document_ports::{
    Document, DocumentKey, DocumentStore, EdgeRecord, ItemRecord, Record, RuleRecord,
    edge_to_record, item_to_record, parse_records, rule_to_record,
};
pub use exporter::{ExportReport, Exporter};
pub use graph_ports::{GraphSnapshot, GraphStore, GraphTransaction};
pub use importer::Importer;
pub use rbac_admin_service::{InitOptions, RbacAdminService};
pub use reconciler::{Reconciler, SyncDefinition, SyncRequest};
pub use transaction_scope::TransactionScope;
