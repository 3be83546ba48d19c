//! Desired-state declarations fed into synchronization.
//!
//! Inputs mirror the loosely typed definition file: every field is optional
//! at parse time and required fields are checked when converting into the
//! validated declaration, so a missing field surfaces as
//! [`AppError::MalformedDefinition`] naming the entry.

use rbacsync_core::{AppError, AppResult};
use serde::Deserialize;

use crate::item::{Item, ItemInput, ItemType};

/// Raw role declaration as read from a definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDeclarationInput {
    /// Role name.
    pub name: Option<String>,
    /// Role description.
    pub description: Option<String>,
    /// Protection flag.
    pub system: Option<bool>,
    /// Optional bound rule.
    pub rule_name: Option<String>,
    /// Optional opaque payload.
    pub data: Option<String>,
}

/// Validated role declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDeclaration {
    name: String,
    description: String,
    system: bool,
    rule_name: Option<String>,
    data: Option<String>,
}

impl RoleDeclaration {
    /// Validates required fields `name`, `description` and `system`.
    pub fn new(input: RoleDeclarationInput) -> AppResult<Self> {
        let name = required(input.name, "role", "name", None)?;
        let description = required(input.description, "role", "description", Some(&name))?;
        let system = required(input.system, "role", "system", Some(&name))?;

        Ok(Self {
            name,
            description,
            system,
            rule_name: input.rule_name,
            data: input.data,
        })
    }

    /// Returns the declared role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Builds the role item to persist when the role does not exist yet.
    pub fn to_item(&self) -> AppResult<Item> {
        Item::new(ItemInput {
            name: self.name.clone(),
            item_type: ItemType::Role,
            description: Some(self.description.clone()),
            rule_name: self.rule_name.clone(),
            data: self.data.clone(),
            system: self.system,
            category: None,
        })
    }
}

/// Raw special permission declaration as read from a definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDeclarationInput {
    /// Permission name.
    pub name: Option<String>,
    /// Permission description.
    pub description: Option<String>,
    /// Grouping category.
    pub category: Option<String>,
    /// Optional bound rule.
    pub rule_name: Option<String>,
    /// Optional opaque payload.
    pub data: Option<String>,
    /// Optional protection flag, defaults to false.
    pub system: Option<bool>,
}

/// Validated permission candidate, either discovered or declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDeclaration {
    name: String,
    description: String,
    category: String,
    rule_name: Option<String>,
    data: Option<String>,
    system: bool,
}

impl PermissionDeclaration {
    /// Validates required fields `name`, `description` and `category`.
    pub fn new(input: PermissionDeclarationInput) -> AppResult<Self> {
        let name = required(input.name, "permission", "name", None)?;
        let description = required(input.description, "permission", "description", Some(&name))?;
        let category = required(input.category, "permission", "category", Some(&name))?;

        Ok(Self {
            name,
            description,
            category,
            rule_name: input.rule_name,
            data: input.data,
            system: input.system.unwrap_or(false),
        })
    }

    /// Returns the permission name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the permission category.
    #[must_use]
    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    /// Builds the permission item to persist when it does not exist yet.
    pub fn to_item(&self) -> AppResult<Item> {
        Item::new(ItemInput {
            name: self.name.clone(),
            item_type: ItemType::Permission,
            description: Some(self.description.clone()),
            rule_name: self.rule_name.clone(),
            data: self.data.clone(),
            system: self.system,
            category: Some(self.category.clone()),
        })
    }
}

/// Raw per-category grant value: a list of actions or the keyword `all`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CategoryGrantInput {
    /// Explicit action names within the category.
    Actions(Vec<String>),
    /// Keyword value; only `all` is accepted.
    Keyword(String),
}

/// Validated per-category grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryGrant {
    /// Grant `Category + Action` for each listed action.
    Actions(Vec<String>),
    /// Grant every synchronized permission of the category.
    All,
}

/// Role to permission mapping entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMapping {
    role: String,
    grants: Vec<(String, CategoryGrant)>,
}

impl RoleMapping {
    /// Validates grant values for one role.
    pub fn new(
        role: impl Into<String>,
        grants: impl IntoIterator<Item = (String, CategoryGrantInput)>,
    ) -> AppResult<Self> {
        let role = role.into();
        let grants = grants
            .into_iter()
            .map(|(category, grant)| {
                let grant = match grant {
                    CategoryGrantInput::Actions(actions) => CategoryGrant::Actions(actions),
                    CategoryGrantInput::Keyword(keyword) if keyword == "all" => CategoryGrant::All,
                    CategoryGrantInput::Keyword(keyword) => {
                        return Err(AppError::MalformedDefinition(format!(
                            "wrong permission value '{keyword}' for category '{category}' and role '{role}'"
                        )));
                    }
                };
                Ok((category, grant))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self { role, grants })
    }

    /// Returns the role receiving the grants.
    #[must_use]
    pub fn role(&self) -> &str {
        self.role.as_str()
    }

    /// Returns category grants in declaration order.
    #[must_use]
    pub fn grants(&self) -> &[(String, CategoryGrant)] {
        &self.grants
    }
}

fn required<T>(
    value: Option<T>,
    entity: &str,
    field: &str,
    name: Option<&String>,
) -> AppResult<T> {
    value.ok_or_else(|| match name {
        Some(name) => AppError::MalformedDefinition(format!(
            "{entity} '{name}' does not contain required element '{field}'"
        )),
        None => AppError::MalformedDefinition(format!(
            "{entity} definition does not contain required element '{field}'"
        )),
    })
}
