use rbacsync_core::{AppError, AppResult};
use rbacsync_domain::{
    ADMIN_ROLE_NAME, CategoryGrant, Edge, RoleMapping, permission_name, upper_first,
};

use crate::change_report::{ChangeAction, ChangeSubject, SyncReport, SyncWarning, edge_label};
use crate::graph_ports::GraphTransaction;

use super::TrackedItems;

/// Grants every tracked permission to the admin role.
pub(super) async fn grant_all_to_admin(
    transaction: &mut dyn GraphTransaction,
    roles: &TrackedItems,
    permissions: &TrackedItems,
    report: &mut SyncReport,
) -> AppResult<()> {
    if roles.get(ADMIN_ROLE_NAME).is_none() {
        return Err(AppError::NotFound(format!(
            "role '{ADMIN_ROLE_NAME}' is not declared"
        )));
    }

    for permission in permissions.iter() {
        ensure_edge(transaction, ADMIN_ROLE_NAME, permission.name(), report).await?;
    }

    Ok(())
}

/// Applies one declared role mapping.
pub(super) async fn apply_role_mapping(
    transaction: &mut dyn GraphTransaction,
    mapping: &RoleMapping,
    roles: &TrackedItems,
    permissions: &TrackedItems,
    report: &mut SyncReport,
) -> AppResult<()> {
    let role = mapping.role();
    if !roles.contains(role) {
        return Err(AppError::MalformedDefinition(format!(
            "permissions are mapped to undeclared role '{role}'"
        )));
    }

    for (category, grant) in mapping.grants() {
        match grant {
            CategoryGrant::Actions(actions) => {
                for action in actions {
                    let permission = permission_name(category, action);
                    if !permissions.contains(&permission) {
                        return Err(AppError::UnknownPermission {
                            permission,
                            role: role.to_owned(),
                        });
                    }

                    ensure_edge(transaction, role, &permission, report).await?;
                }
            }
            CategoryGrant::All => {
                let category = upper_first(category);
                let matching = permissions
                    .iter()
                    .filter(|permission| permission.category() == Some(category.as_str()))
                    .map(|permission| permission.name().to_owned())
                    .collect::<Vec<_>>();

                if matching.is_empty() {
                    report.warn(SyncWarning::EmptyCategoryGrant {
                        role: role.to_owned(),
                        category,
                    });
                    continue;
                }

                for permission in matching {
                    ensure_edge(transaction, role, &permission, report).await?;
                }
            }
        }
    }

    Ok(())
}

async fn ensure_edge(
    transaction: &mut dyn GraphTransaction,
    parent: &str,
    child: &str,
    report: &mut SyncReport,
) -> AppResult<()> {
    let label = edge_label(parent, child);
    if transaction.edge_exists(parent, child).await? {
        report.record(ChangeAction::Skipped, ChangeSubject::Edge, label);
        return Ok(());
    }

    transaction.insert_edge(&Edge::new(parent, child)?).await?;
    report.record(ChangeAction::Created, ChangeSubject::Edge, label);

    Ok(())
}
