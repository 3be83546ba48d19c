use crate::declaration::{PermissionDeclaration, PermissionDeclarationInput};
use rbacsync_core::AppResult;

/// Permission candidate derived from one action of the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPermission {
    /// Originating action-surface component, e.g. `User`.
    pub category: String,
    /// Action name within the component, e.g. `Edit`.
    pub action: String,
    /// Stable permission name, e.g. `UserEdit`.
    pub name: String,
    /// Generated description.
    pub description: String,
}

impl DiscoveredPermission {
    /// Derives the permission for a controller action.
    #[must_use]
    pub fn from_action(category: &str, action: &str) -> Self {
        let category = upper_first(category);
        let action = upper_first(action);

        Self {
            name: permission_name(&category, &action),
            description: format!("Allow to {} the {category}.", action.to_lowercase()),
            category,
            action,
        }
    }

    /// Converts the candidate into a permission declaration.
    pub fn into_declaration(self) -> AppResult<PermissionDeclaration> {
        PermissionDeclaration::new(PermissionDeclarationInput {
            name: Some(self.name),
            description: Some(self.description),
            category: Some(self.category),
            ..PermissionDeclarationInput::default()
        })
    }
}

/// Upper-cases the first character and keeps the rest untouched.
#[must_use]
pub fn upper_first(value: &str) -> String {
    let mut characters = value.chars();
    match characters.next() {
        Some(first) => first.to_uppercase().chain(characters).collect(),
        None => String::new(),
    }
}

/// Forms the permission primary key from a category and an action.
#[must_use]
pub fn permission_name(category: &str, action: &str) -> String {
    format!("{}{}", upper_first(category), upper_first(action))
}

/// Normalizes an action reference from an action-surface manifest.
///
/// Accepts inline method names (`actionEdit`), plain names (`Edit`) and
/// standalone action classes (`app\actions\ExportAction`).
#[must_use]
pub fn normalize_action_name(reference: &str) -> String {
    let segment = last_segment(reference);

    let without_prefix = match segment.strip_prefix("action") {
        Some(rest) if rest.starts_with(|character: char| character.is_ascii_uppercase()) => rest,
        _ => segment,
    };

    let without_suffix = match without_prefix.strip_suffix("Action") {
        Some(rest) if !rest.is_empty() => rest,
        _ => without_prefix,
    };

    upper_first(without_suffix)
}

/// Normalizes a controller reference (`app\controllers\UserController`)
/// into its category name (`User`).
#[must_use]
pub fn normalize_category_name(reference: &str) -> String {
    let segment = last_segment(reference);
    let without_suffix = match segment.strip_suffix("Controller") {
        Some(rest) if !rest.is_empty() => rest,
        _ => segment,
    };

    upper_first(without_suffix)
}

fn last_segment(reference: &str) -> &str {
    reference
        .rsplit(['\\', ':', '/'])
        .next()
        .unwrap_or(reference)
        .trim()
}
