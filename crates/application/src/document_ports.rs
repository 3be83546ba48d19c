mod records;

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde_json::{Map, Value};

use rbacsync_core::AppResult;
use rbacsync_domain::{ItemType, Locale};

pub use records::{
    EdgeRecord, ItemRecord, RuleRecord, edge_to_record, item_to_record, parse_records,
    rule_to_record,
};

/// One flat record of a document.
pub type Record = Map<String, Value>;

/// Ordered list of flat records exchanged with the document store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(Vec<Record>);

impl Document {
    /// Creates a document from records.
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self(records)
    }

    /// Returns records in document order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.0
    }

    /// Consumes the document and returns its records.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.0
    }

    /// Returns the first record whose `name` equals the given value.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Record> {
        self.0
            .iter()
            .find(|record| record.get("name").and_then(Value::as_str) == Some(name))
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the document has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

const ROLES_PREFIX: &str = "auth-roles.";
const PERMISSIONS_PREFIX: &str = "auth-permissions.";
const ITEM_CHILDREN_KEY: &str = "auth-item-child";
const RULES_KEY: &str = "auth-rule";

/// Logical document name, scoped by entity and for items by locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKey {
    /// Localized role items.
    Roles(Locale),
    /// Localized permission items.
    Permissions(Locale),
    /// Locale independent edges.
    ItemChildren,
    /// Locale independent rules.
    Rules,
}

impl DocumentKey {
    /// Returns the item document key for a type and locale.
    #[must_use]
    pub fn for_items(item_type: ItemType, locale: Locale) -> Self {
        match item_type {
            ItemType::Role => Self::Roles(locale),
            ItemType::Permission => Self::Permissions(locale),
        }
    }

    /// Returns the stable key string, e.g. `auth-roles.en`.
    #[must_use]
    pub fn as_key(&self) -> String {
        match self {
            Self::Roles(locale) => format!("{ROLES_PREFIX}{locale}"),
            Self::Permissions(locale) => format!("{PERMISSIONS_PREFIX}{locale}"),
            Self::ItemChildren => ITEM_CHILDREN_KEY.to_owned(),
            Self::Rules => RULES_KEY.to_owned(),
        }
    }

    /// Parses a stable key string; unknown keys yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if value == ITEM_CHILDREN_KEY {
            return Some(Self::ItemChildren);
        }

        if value == RULES_KEY {
            return Some(Self::Rules);
        }

        if let Some(suffix) = value.strip_prefix(ROLES_PREFIX) {
            return Locale::new(suffix).ok().map(Self::Roles);
        }

        value
            .strip_prefix(PERMISSIONS_PREFIX)
            .and_then(|suffix| Locale::new(suffix).ok())
            .map(Self::Permissions)
    }

    /// Returns the locale of a role document key.
    #[must_use]
    pub fn role_locale(&self) -> Option<&Locale> {
        match self {
            Self::Roles(locale) => Some(locale),
            _ => None,
        }
    }
}

impl Display for DocumentKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_key().as_str())
    }
}

/// Port for reading and writing named export documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads a document; a missing document yields `None`.
    ///
    /// Content that is not a list of flat records fails with
    /// `AppError::MalformedDocument`.
    async fn load(&self, key: &DocumentKey) -> AppResult<Option<Document>>;

    /// Writes a document, replacing any previous content.
    async fn save(&self, key: &DocumentKey, document: &Document) -> AppResult<()>;

    /// Lists keys of stored documents.
    async fn list_keys(&self) -> AppResult<Vec<DocumentKey>>;
}
