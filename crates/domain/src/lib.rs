//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod declaration;
mod discovery;
mod graph;
mod item;
mod locale;

pub use declaration::{
    CategoryGrant, CategoryGrantInput, PermissionDeclaration, PermissionDeclarationInput,
    RoleDeclaration, RoleDeclarationInput, RoleMapping,
};
pub use discovery::{
    DiscoveredPermission, normalize_action_name, normalize_category_name, permission_name,
    upper_first,
};
pub use graph::{Assignment, Edge, Rule};
pub use item::{ADMIN_ROLE_NAME, Item, ItemInput, ItemType};
pub use locale::Locale;
