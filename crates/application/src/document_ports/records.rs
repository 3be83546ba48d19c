use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use rbacsync_core::{AppError, AppResult};
use rbacsync_domain::{Edge, Item, ItemInput, ItemType, Rule};

use super::{Document, DocumentKey, Record};

/// Item entry of a roles or permissions document.
///
/// Optional fields are wrapped twice so that an absent key (`None`) can be
/// told apart from an explicit `null` (`Some(None)`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemRecord {
    /// Item name.
    pub name: String,
    /// Declared item type, when present.
    #[serde(rename = "type", default)]
    pub item_type: Option<ItemType>,
    /// Declared description.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    /// Declared rule binding.
    #[serde(default, deserialize_with = "present")]
    pub rule_name: Option<Option<String>>,
    /// Declared payload.
    #[serde(default, deserialize_with = "present")]
    pub data: Option<Option<String>>,
    /// Declared protection flag.
    #[serde(default)]
    pub system: Option<bool>,
    /// Declared category.
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
}

impl ItemRecord {
    /// Builds a new item of the given type from the declared fields.
    pub fn to_item(&self, item_type: ItemType) -> AppResult<Item> {
        Item::new(ItemInput {
            name: self.name.clone(),
            item_type,
            description: self.description.clone().flatten(),
            rule_name: self.rule_name.clone().flatten(),
            data: self.data.clone().flatten(),
            system: self.system.unwrap_or(false),
            category: self.category.clone().flatten(),
        })
    }

    /// Overwrites the fields this record declares, leaving the rest untouched.
    pub fn apply_to(&self, item: &mut Item) -> AppResult<()> {
        if let Some(description) = &self.description {
            item.set_description(description.clone());
        }
        if let Some(rule_name) = &self.rule_name {
            item.set_rule_name(rule_name.clone())?;
        }
        if let Some(data) = &self.data {
            item.set_data(data.clone());
        }
        if let Some(system) = self.system {
            item.set_system(system);
        }
        if let Some(category) = &self.category {
            item.set_category(category.clone())?;
        }

        Ok(())
    }
}

/// Entry of the edge document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EdgeRecord {
    /// Granting item name.
    pub parent: String,
    /// Granted item name.
    pub child: String,
}

/// Entry of the rule document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleRecord {
    /// Rule name.
    pub name: String,
    /// Opaque payload.
    #[serde(default)]
    pub data: Option<String>,
}

/// Serializes an item into its flat document record.
#[must_use]
pub fn item_to_record(item: &Item) -> Record {
    let mut record = Record::new();
    record.insert("name".to_owned(), Value::from(item.name()));
    record.insert("type".to_owned(), Value::from(item.item_type().as_str()));
    record.insert("description".to_owned(), optional_text(item.description()));
    record.insert("rule_name".to_owned(), optional_text(item.rule_name()));
    record.insert("data".to_owned(), optional_text(item.data()));
    record.insert("system".to_owned(), Value::Bool(item.is_system()));
    record.insert("category".to_owned(), optional_text(item.category()));
    record.insert("created_at".to_owned(), timestamp(item.created_at()));
    record.insert("updated_at".to_owned(), timestamp(item.updated_at()));
    record
}

/// Serializes an edge into its flat document record.
#[must_use]
pub fn edge_to_record(edge: &Edge) -> Record {
    let mut record = Record::new();
    record.insert("parent".to_owned(), Value::from(edge.parent()));
    record.insert("child".to_owned(), Value::from(edge.child()));
    record
}

/// Serializes a rule into its flat document record.
#[must_use]
pub fn rule_to_record(rule: &Rule) -> Record {
    let mut record = Record::new();
    record.insert("name".to_owned(), Value::from(rule.name()));
    record.insert("data".to_owned(), optional_text(rule.data()));
    record.insert("created_at".to_owned(), timestamp(rule.created_at()));
    record.insert("updated_at".to_owned(), timestamp(rule.updated_at()));
    record
}

/// Parses every record of a document into a typed entry.
pub fn parse_records<T>(key: &DocumentKey, document: &Document) -> AppResult<Vec<T>>
where
    T: DeserializeOwned,
{
    document
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(Value::Object(record.clone())).map_err(|error| {
                AppError::malformed_document(key.as_key(), format!("record {index}: {error}"))
            })
        })
        .collect()
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

fn timestamp(value: Option<DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, |value| {
        Value::from(value.to_rfc3339_opts(SecondsFormat::Secs, true))
    })
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
