use std::str::FromStr;

use chrono::{DateTime, Utc};
use rbacsync_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Name of the role that receives every synchronized permission.
pub const ADMIN_ROLE_NAME: &str = "admin";

/// Discriminates the two kinds of graph items sharing one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Role node; may own permissions and be assigned to users.
    Role,
    /// Permission node; granted to roles through edges.
    Permission,
}

impl ItemType {
    /// Returns a stable storage value for the item type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Permission => "permission",
        }
    }
}

impl FromStr for ItemType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "role" => Ok(Self::Role),
            "permission" => Ok(Self::Permission),
            _ => Err(AppError::Validation(format!(
                "unknown item type '{value}'"
            ))),
        }
    }
}

/// Construction payload for [`Item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInput {
    /// Unique item name across roles and permissions.
    pub name: String,
    /// Item kind.
    pub item_type: ItemType,
    /// Localized description.
    pub description: Option<String>,
    /// Optional bound rule name.
    pub rule_name: Option<String>,
    /// Opaque payload.
    pub data: Option<String>,
    /// Protection flag.
    pub system: bool,
    /// Originating action-surface component; permissions only.
    pub category: Option<String>,
}

/// A named role or permission node in the RBAC graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    name: NonEmptyString,
    item_type: ItemType,
    description: Option<String>,
    rule_name: Option<NonEmptyString>,
    data: Option<String>,
    system: bool,
    category: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Creates a validated item that has not been persisted yet.
    pub fn new(input: ItemInput) -> AppResult<Self> {
        let name = NonEmptyString::new(input.name)
            .map_err(|_| AppError::Validation("item name must not be empty".to_owned()))?;
        let mut item = Self {
            name,
            item_type: input.item_type,
            description: input.description,
            rule_name: None,
            data: input.data,
            system: input.system,
            category: None,
            created_at: None,
            updated_at: None,
        };
        item.set_rule_name(input.rule_name)?;
        item.set_category(input.category)?;

        Ok(item)
    }

    /// Attaches store-managed timestamps.
    #[must_use]
    pub fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    /// Returns the unique item name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the item kind.
    #[must_use]
    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    /// Returns true for role items.
    #[must_use]
    pub fn is_role(&self) -> bool {
        self.item_type == ItemType::Role
    }

    /// Returns the localized description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the bound rule name.
    #[must_use]
    pub fn rule_name(&self) -> Option<&str> {
        self.rule_name.as_ref().map(NonEmptyString::as_str)
    }

    /// Returns the opaque payload.
    #[must_use]
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Returns whether the item is protected.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.system
    }

    /// Returns the permission category.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Returns the creation timestamp, once persisted.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns the last update timestamp, once persisted.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Replaces the description.
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    /// Replaces the bound rule name.
    pub fn set_rule_name(&mut self, rule_name: Option<String>) -> AppResult<()> {
        self.rule_name = rule_name
            .filter(|value| !value.is_empty())
            .map(NonEmptyString::new)
            .transpose()?;
        Ok(())
    }

    /// Replaces the opaque payload.
    pub fn set_data(&mut self, data: Option<String>) {
        self.data = data;
    }

    /// Replaces the protection flag.
    pub fn set_system(&mut self, system: bool) {
        self.system = system;
    }

    /// Replaces the category; roles never carry one.
    pub fn set_category(&mut self, category: Option<String>) -> AppResult<()> {
        let category = category.filter(|value| !value.is_empty());
        if category.is_some() && self.item_type == ItemType::Role {
            return Err(AppError::Validation(format!(
                "role '{}' cannot have a category",
                self.name
            )));
        }

        self.category = category;
        Ok(())
    }
}
