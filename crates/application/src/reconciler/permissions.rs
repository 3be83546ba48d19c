use std::collections::BTreeMap;

use rbacsync_core::AppResult;
use rbacsync_domain::{
    DiscoveredPermission, ItemType, PermissionDeclaration, PermissionDeclarationInput,
};

use crate::change_report::{ChangeAction, ChangeSubject, SyncReport};
use crate::graph_ports::GraphTransaction;

use super::TrackedItems;

/// Creates missing candidate permissions, discovered ones first.
///
/// Permissions absent from the candidates are only deleted when
/// `delete_obsolete` is set.
pub(super) async fn sync_permissions(
    transaction: &mut dyn GraphTransaction,
    discovered: Vec<DiscoveredPermission>,
    special: &[PermissionDeclarationInput],
    delete_obsolete: bool,
    report: &mut SyncReport,
) -> AppResult<TrackedItems> {
    let mut stale = transaction
        .list_items(ItemType::Permission)
        .await?
        .into_iter()
        .map(|item| (item.name().to_owned(), item))
        .collect::<BTreeMap<_, _>>();

    let candidates = discovered
        .into_iter()
        .map(DiscoveredPermission::into_declaration)
        .chain(
            special
                .iter()
                .cloned()
                .map(PermissionDeclaration::new),
        );
    let mut tracked = TrackedItems::default();

    for candidate in candidates {
        let declaration = candidate?;
        let name = declaration.name();

        if tracked.contains(name) {
            report.record(ChangeAction::Skipped, ChangeSubject::Permission, name);
            continue;
        }

        if let Some(existing) = stale.remove(name) {
            report.record(ChangeAction::Skipped, ChangeSubject::Permission, name);
            tracked.track(existing);
            continue;
        }

        let created = transaction.insert_item(&declaration.to_item()?).await?;
        report.record(ChangeAction::Created, ChangeSubject::Permission, name);
        tracked.track(created);
    }

    if delete_obsolete {
        for name in stale.into_keys() {
            if transaction.delete_item(ItemType::Permission, &name).await? {
                report.record(ChangeAction::Removed, ChangeSubject::Permission, name);
            }
        }
    }

    Ok(tracked)
}
