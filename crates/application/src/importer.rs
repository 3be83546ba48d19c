use std::collections::BTreeMap;
use std::sync::Arc;

use rbacsync_core::{AppError, AppResult};
use rbacsync_domain::{Edge, ItemType, Locale, Rule};

use crate::change_report::{
    ChangeAction, ChangeSubject, ImportReport, assignment_label, edge_label,
};
use crate::document_ports::{
    Document, DocumentKey, DocumentStore, EdgeRecord, ItemRecord, RuleRecord, parse_records,
};
use crate::graph_ports::GraphTransaction;
use crate::reconciler::ensure_admin_assignment;

/// Replays exported documents of one locale into a graph transaction.
#[derive(Clone)]
pub struct Importer {
    document_store: Arc<dyn DocumentStore>,
    admin_user_id: String,
}

impl Importer {
    /// Creates an importer reading from the given document store.
    #[must_use]
    pub fn new(document_store: Arc<dyn DocumentStore>, admin_user_id: impl Into<String>) -> Self {
        Self {
            document_store,
            admin_user_id: admin_user_id.into(),
        }
    }

    /// Upserts rules, roles, permissions and edges, bootstraps the admin
    /// assignment and sweeps orphaned edges and assignments.
    ///
    /// Absent roles are removed only when they were protected before the
    /// import started; absent permissions are always removed.
    pub async fn import(
        &self,
        transaction: &mut dyn GraphTransaction,
        locale: &Locale,
    ) -> AppResult<ImportReport> {
        let roles_key = DocumentKey::Roles(locale.clone());
        let permissions_key = DocumentKey::Permissions(locale.clone());

        let roles = parse_items(&roles_key, &self.require(&roles_key).await?, ItemType::Role)?;
        let permissions = parse_items(
            &permissions_key,
            &self.require(&permissions_key).await?,
            ItemType::Permission,
        )?;
        let edges = parse_records::<EdgeRecord>(
            &DocumentKey::ItemChildren,
            &self.require(&DocumentKey::ItemChildren).await?,
        )?;
        let rules = parse_records::<RuleRecord>(
            &DocumentKey::Rules,
            &self.require(&DocumentKey::Rules).await?,
        )?;

        let mut report = ImportReport::default();

        import_rules(transaction, &rules, &mut report).await?;
        import_items(transaction, ItemType::Role, &roles, &mut report).await?;
        import_items(transaction, ItemType::Permission, &permissions, &mut report).await?;
        import_edges(transaction, &edges, &mut report).await?;
        ensure_admin_assignment(transaction, self.admin_user_id.as_str(), &mut report).await?;
        sweep_orphans(transaction, &mut report).await?;

        Ok(report)
    }

    async fn require(&self, key: &DocumentKey) -> AppResult<Document> {
        self.document_store
            .load(key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("document '{key}' does not exist")))
    }
}

fn parse_items(
    key: &DocumentKey,
    document: &Document,
    item_type: ItemType,
) -> AppResult<Vec<ItemRecord>> {
    let records = parse_records::<ItemRecord>(key, document)?;
    if let Some(record) = records
        .iter()
        .find(|record| record.item_type.is_some_and(|declared| declared != item_type))
    {
        return Err(AppError::malformed_document(
            key.as_key(),
            format!(
                "item '{}' is not of type '{}'",
                record.name,
                item_type.as_str()
            ),
        ));
    }

    Ok(records)
}

async fn import_rules(
    transaction: &mut dyn GraphTransaction,
    records: &[RuleRecord],
    report: &mut ImportReport,
) -> AppResult<()> {
    for record in records {
        match transaction.find_rule(&record.name).await? {
            Some(mut rule) => {
                rule.set_data(record.data.clone());
                transaction.update_rule(&rule).await?;
                report.record(ChangeAction::Updated, ChangeSubject::Rule, record.name.as_str());
            }
            None => {
                transaction
                    .insert_rule(&Rule::new(record.name.as_str(), record.data.clone())?)
                    .await?;
                report.record(ChangeAction::Created, ChangeSubject::Rule, record.name.as_str());
            }
        }
    }

    Ok(())
}

async fn import_items(
    transaction: &mut dyn GraphTransaction,
    item_type: ItemType,
    records: &[ItemRecord],
    report: &mut ImportReport,
) -> AppResult<()> {
    let subject = match item_type {
        ItemType::Role => ChangeSubject::Role,
        ItemType::Permission => ChangeSubject::Permission,
    };
    let mut absent = transaction
        .list_items(item_type)
        .await?
        .into_iter()
        .map(|item| (item.name().to_owned(), item.is_system()))
        .collect::<BTreeMap<_, _>>();

    for record in records {
        absent.remove(record.name.as_str());

        match transaction.find_item(&record.name).await? {
            Some(mut existing) => {
                if existing.item_type() != item_type {
                    return Err(AppError::constraint(
                        "item",
                        "type",
                        format!(
                            "item '{}' is stored as {} and cannot be imported as {}",
                            record.name,
                            existing.item_type().as_str(),
                            item_type.as_str()
                        ),
                    ));
                }

                record.apply_to(&mut existing)?;
                transaction.update_item(&existing).await?;
                report.record(ChangeAction::Updated, subject, record.name.as_str());
            }
            None => {
                transaction.insert_item(&record.to_item(item_type)?).await?;
                report.record(ChangeAction::Created, subject, record.name.as_str());
            }
        }
    }

    for (name, was_system) in absent {
        let removable = match item_type {
            ItemType::Role => was_system,
            ItemType::Permission => true,
        };

        if !removable {
            report.record(ChangeAction::Skipped, subject, name);
            continue;
        }

        if transaction.delete_item(item_type, &name).await? {
            report.record(ChangeAction::Removed, subject, name);
        }
    }

    Ok(())
}

async fn import_edges(
    transaction: &mut dyn GraphTransaction,
    records: &[EdgeRecord],
    report: &mut ImportReport,
) -> AppResult<()> {
    for record in records {
        let label = edge_label(&record.parent, &record.child);
        if transaction
            .edge_exists(&record.parent, &record.child)
            .await?
        {
            report.record(ChangeAction::Skipped, ChangeSubject::Edge, label);
            continue;
        }

        transaction
            .insert_edge(&Edge::new(record.parent.as_str(), record.child.as_str())?)
            .await?;
        report.record(ChangeAction::Created, ChangeSubject::Edge, label);
    }

    Ok(())
}

async fn sweep_orphans(
    transaction: &mut dyn GraphTransaction,
    report: &mut ImportReport,
) -> AppResult<()> {
    let role_names = item_names(transaction, ItemType::Role).await?;
    let permission_names = item_names(transaction, ItemType::Permission).await?;

    for edge in transaction
        .delete_orphan_edges(&role_names, &permission_names)
        .await?
    {
        report.record(
            ChangeAction::Removed,
            ChangeSubject::Edge,
            edge_label(edge.parent(), edge.child()),
        );
    }

    for assignment in transaction.delete_orphan_assignments(&role_names).await? {
        report.record(
            ChangeAction::Removed,
            ChangeSubject::Assignment,
            assignment_label(assignment.user_id(), assignment.item_name()),
        );
    }

    Ok(())
}

async fn item_names(
    transaction: &mut dyn GraphTransaction,
    item_type: ItemType,
) -> AppResult<Vec<String>> {
    Ok(transaction
        .list_items(item_type)
        .await?
        .into_iter()
        .map(|item| item.name().to_owned())
        .collect())
}
