//! Shared primitives for all Rust crates in rbacsync.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across rbacsync crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A declared role, permission or role mapping is incomplete or invalid.
    #[error("malformed definition: {0}")]
    MalformedDefinition(String),

    /// A role mapping references a permission that was not synchronized.
    #[error("permission '{permission}' for role '{role}' not found")]
    UnknownPermission {
        /// Name of the missing permission.
        permission: String,
        /// Role whose mapping referenced the permission.
        role: String,
    },

    /// A graph store write would break uniqueness or referential integrity.
    #[error("constraint violation on {entity}.{field}: {detail}")]
    ConstraintViolation {
        /// Entity collection the write targeted.
        entity: String,
        /// Offending field.
        field: String,
        /// Human readable detail naming the offending value.
        detail: String,
    },

    /// An import/export document does not have the expected shape.
    #[error("malformed document '{document}': {detail}")]
    MalformedDocument {
        /// Document key.
        document: String,
        /// Parser or shape error.
        detail: String,
    },

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a constraint violation for an entity field.
    #[must_use]
    pub fn constraint(
        entity: impl Into<String>,
        field: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::ConstraintViolation {
            entity: entity.into(),
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// Builds a malformed document error.
    #[must_use]
    pub fn malformed_document(document: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedDocument {
            document: document.into(),
            detail: detail.into(),
        }
    }
}
