use std::collections::BTreeMap;

use rbacsync_core::AppResult;
use rbacsync_domain::{ItemType, RoleDeclaration, RoleDeclarationInput};

use crate::change_report::{ChangeAction, ChangeSubject, SyncReport};
use crate::graph_ports::GraphTransaction;

use super::TrackedItems;

/// Creates declared roles that do not exist yet and deletes undeclared ones.
pub(super) async fn sync_roles(
    transaction: &mut dyn GraphTransaction,
    declarations: &[RoleDeclarationInput],
    report: &mut SyncReport,
) -> AppResult<TrackedItems> {
    let mut stale = transaction
        .list_items(ItemType::Role)
        .await?
        .into_iter()
        .map(|item| (item.name().to_owned(), item))
        .collect::<BTreeMap<_, _>>();
    let mut tracked = TrackedItems::default();

    for input in declarations {
        let declaration = RoleDeclaration::new(input.clone())?;
        let name = declaration.name();

        if tracked.contains(name) {
            report.record(ChangeAction::Skipped, ChangeSubject::Role, name);
            continue;
        }

        if let Some(existing) = stale.remove(name) {
            report.record(ChangeAction::Skipped, ChangeSubject::Role, name);
            tracked.track(existing);
            continue;
        }

        let created = transaction.insert_item(&declaration.to_item()?).await?;
        report.record(ChangeAction::Created, ChangeSubject::Role, name);
        tracked.track(created);
    }

    for name in stale.into_keys() {
        if transaction.delete_item(ItemType::Role, &name).await? {
            report.record(ChangeAction::Removed, ChangeSubject::Role, name);
        }
    }

    Ok(tracked)
}
