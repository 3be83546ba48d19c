mod grants;
mod permissions;
mod roles;


use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use rbacsync_core::{AppError, AppResult};
use rbacsync_domain::{
    ADMIN_ROLE_NAME, Assignment, CategoryGrantInput, DiscoveredPermission, Item,
    PermissionDeclarationInput, RoleDeclarationInput, RoleMapping,
};

use crate::change_report::{ChangeAction, ChangeSubject, SyncReport, assignment_label};
use crate::graph_ports::GraphTransaction;

/// Desired state read from the definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDefinition {
    /// Declared roles.
    #[serde(default)]
    pub roles: Vec<RoleDeclarationInput>,
    /// Permissions that cannot be discovered from the action surface.
    #[serde(default)]
    pub special_permissions: Vec<PermissionDeclarationInput>,
    /// Role name to per-category grants.
    #[serde(default, rename = "permissions")]
    pub role_mappings: BTreeMap<String, BTreeMap<String, CategoryGrantInput>>,
}

/// Input of one synchronization run.
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    /// Declared desired state.
    pub definition: SyncDefinition,
    /// Candidates from the discovery provider.
    pub discovered: Vec<DiscoveredPermission>,
    /// Whether permissions absent from the candidates are deleted.
    pub delete_obsolete_permissions: bool,
}

/// Reconciles declared roles and permissions against the stored graph.
#[derive(Debug, Clone)]
pub struct Reconciler {
    admin_user_id: String,
}

impl Reconciler {
    /// Creates a reconciler bootstrapping the given administrative user.
    #[must_use]
    pub fn new(admin_user_id: impl Into<String>) -> Self {
        Self {
            admin_user_id: admin_user_id.into(),
        }
    }

    /// Returns the administrative user bound to the admin role.
    #[must_use]
    pub fn admin_user_id(&self) -> &str {
        self.admin_user_id.as_str()
    }

    /// Applies role sync, permission sync, admin grants, role mappings and
    /// the bootstrap assignment in that order.
    ///
    /// Any error leaves partial writes in the transaction; the caller must
    /// roll it back.
    pub async fn synchronize(
        &self,
        transaction: &mut dyn GraphTransaction,
        request: SyncRequest,
    ) -> AppResult<SyncReport> {
        let SyncRequest {
            definition,
            discovered,
            delete_obsolete_permissions,
        } = request;
        let mut report = SyncReport::default();

        let roles = roles::sync_roles(transaction, &definition.roles, &mut report).await?;
        let permissions = permissions::sync_permissions(
            transaction,
            discovered,
            &definition.special_permissions,
            delete_obsolete_permissions,
            &mut report,
        )
        .await?;

        grants::grant_all_to_admin(transaction, &roles, &permissions, &mut report).await?;

        for (role, category_grants) in definition.role_mappings {
            let mapping = RoleMapping::new(role, category_grants)?;
            grants::apply_role_mapping(transaction, &mapping, &roles, &permissions, &mut report)
                .await?;
        }

        ensure_admin_assignment(transaction, self.admin_user_id(), &mut report).await?;

        Ok(report)
    }
}

/// Binds the administrative user to the admin role unless already bound.
pub(crate) async fn ensure_admin_assignment(
    transaction: &mut dyn GraphTransaction,
    user_id: &str,
    report: &mut SyncReport,
) -> AppResult<()> {
    let admin_role = transaction.find_item(ADMIN_ROLE_NAME).await?;
    if !admin_role.as_ref().is_some_and(Item::is_role) {
        return Err(AppError::NotFound(format!(
            "role '{ADMIN_ROLE_NAME}' does not exist"
        )));
    }

    let label = assignment_label(user_id, ADMIN_ROLE_NAME);
    if transaction
        .assignment_exists(user_id, ADMIN_ROLE_NAME)
        .await?
    {
        report.record(ChangeAction::Skipped, ChangeSubject::Assignment, label);
        return Ok(());
    }

    transaction
        .insert_assignment(&Assignment::new(user_id, ADMIN_ROLE_NAME)?)
        .await?;
    report.record(ChangeAction::Created, ChangeSubject::Assignment, label);

    Ok(())
}

/// Items touched during one run, kept in the order they were tracked.
#[derive(Debug, Default)]
pub(crate) struct TrackedItems {
    items: Vec<Item>,
    positions: HashMap<String, usize>,
}

impl TrackedItems {
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Item> {
        self.positions
            .get(name)
            .and_then(|index| self.items.get(*index))
    }

    pub(crate) fn track(&mut self, item: Item) {
        if self.contains(item.name()) {
            return;
        }

        self.positions
            .insert(item.name().to_owned(), self.items.len());
        self.items.push(item);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }
}
