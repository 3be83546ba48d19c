use chrono::{DateTime, Utc};
use rbacsync_core::{AppError, AppResult, NonEmptyString};

/// Directed grant relationship: `parent` contains `child`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    parent: NonEmptyString,
    child: NonEmptyString,
}

impl Edge {
    /// Creates a validated edge.
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> AppResult<Self> {
        let parent = NonEmptyString::new(parent)?;
        let child = NonEmptyString::new(child)?;
        if parent == child {
            return Err(AppError::Validation(format!(
                "item '{parent}' cannot be its own child"
            )));
        }

        Ok(Self { parent, child })
    }

    /// Returns the granting item name.
    #[must_use]
    pub fn parent(&self) -> &str {
        self.parent.as_str()
    }

    /// Returns the granted item name.
    #[must_use]
    pub fn child(&self) -> &str {
        self.child.as_str()
    }
}

/// Named reusable authorization predicate reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: NonEmptyString,
    data: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Rule {
    /// Creates a validated rule that has not been persisted yet.
    pub fn new(name: impl Into<String>, data: Option<String>) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?,
            data,
            created_at: None,
            updated_at: None,
        })
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

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the opaque payload.
    #[must_use]
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Replaces the opaque payload.
    pub fn set_data(&mut self, data: Option<String>) {
        self.data = data;
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
}

/// Binding of a user identity to a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    user_id: NonEmptyString,
    item_name: NonEmptyString,
    created_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Creates a validated assignment.
    pub fn new(user_id: impl Into<String>, item_name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            user_id: NonEmptyString::new(user_id)?,
            item_name: NonEmptyString::new(item_name)?,
            created_at: None,
        })
    }

    /// Attaches the store-managed creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: Option<DateTime<Utc>>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns the user identity.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Returns the assigned role name.
    #[must_use]
    pub fn item_name(&self) -> &str {
        self.item_name.as_str()
    }

    /// Returns the creation timestamp, once persisted.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}
