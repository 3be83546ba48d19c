use std::collections::BTreeSet;
use std::sync::Arc;

use rbacsync_core::AppResult;
use rbacsync_domain::{ItemType, Locale};

use crate::document_ports::{
    Document, DocumentKey, DocumentStore, edge_to_record, item_to_record, rule_to_record,
};
use crate::graph_ports::{GraphSnapshot, GraphStore};

/// Outcome of one export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Locales item documents were written for.
    pub locales: Vec<Locale>,
    /// Keys of written documents in write order.
    pub documents: Vec<DocumentKey>,
}

/// Writes the stored graph into per-locale documents.
#[derive(Clone)]
pub struct Exporter {
    graph_store: Arc<dyn GraphStore>,
    document_store: Arc<dyn DocumentStore>,
}

impl Exporter {
    /// Creates an exporter over the given stores.
    #[must_use]
    pub fn new(graph_store: Arc<dyn GraphStore>, document_store: Arc<dyn DocumentStore>) -> Self {
        Self {
            graph_store,
            document_store,
        }
    }

    /// Exports items for every known locale plus edges and rules.
    ///
    /// Known locales are those of existing role documents together with
    /// `configured`. A description already present in a previous document
    /// wins over the stored one, so translations survive re-export.
    ///
    /// Every previous document is loaded and merged before the first write,
    /// so an unreadable document leaves the whole set untouched.
    pub async fn export(&self, configured: &[Locale]) -> AppResult<ExportReport> {
        let locales = self.collect_locales(configured).await?;
        let snapshot = self.graph_store.snapshot().await?;

        let mut pending = Vec::new();
        for item_type in [ItemType::Role, ItemType::Permission] {
            for locale in &locales {
                let key = DocumentKey::for_items(item_type, locale.clone());
                let previous = self.document_store.load(&key).await?.unwrap_or_default();
                let document = merge_items(&snapshot, item_type, &previous);
                pending.push((key, document));
            }
        }
        pending.push((
            DocumentKey::ItemChildren,
            Document::new(snapshot.edges.iter().map(edge_to_record).collect()),
        ));
        pending.push((
            DocumentKey::Rules,
            Document::new(snapshot.rules.iter().map(rule_to_record).collect()),
        ));

        let mut report = ExportReport {
            locales: locales.into_iter().collect(),
            documents: Vec::with_capacity(pending.len()),
        };
        for (key, document) in pending {
            self.document_store.save(&key, &document).await?;
            report.documents.push(key);
        }

        Ok(report)
    }

    async fn collect_locales(&self, configured: &[Locale]) -> AppResult<BTreeSet<Locale>> {
        let mut locales = self
            .document_store
            .list_keys()
            .await?
            .iter()
            .filter_map(DocumentKey::role_locale)
            .cloned()
            .collect::<BTreeSet<_>>();
        locales.extend(configured.iter().cloned());

        Ok(locales)
    }
}

fn merge_items(snapshot: &GraphSnapshot, item_type: ItemType, previous: &Document) -> Document {
    let records = snapshot
        .items
        .iter()
        .filter(|item| item.item_type() == item_type)
        .map(|item| {
            let mut record = item_to_record(item);
            if let Some(description) = previous
                .find_by_name(item.name())
                .and_then(|entry| entry.get("description"))
            {
                record.insert("description".to_owned(), description.clone());
            }
            record
        })
        .collect();

    Document::new(records)
}
