//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_document_store;
mod in_memory_graph_store;
mod json_file_document_store;
mod json_sync_definition;
mod postgres_graph_store;
mod static_permission_discovery;

pub use in_memory_document_store::InMemoryDocumentStore;
pub use in_memory_graph_store::InMemoryGraphStore;
pub use json_file_document_store::JsonFileDocumentStore;
pub use json_sync_definition::{load_sync_definition, parse_sync_definition};
pub use postgres_graph_store::PostgresGraphStore;
pub use static_permission_discovery::StaticPermissionDiscovery;
