use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use rbacsync_core::AppResult;
use rbacsync_domain::{Assignment, Edge, Item, ItemInput, ItemType, Rule};

#[derive(Debug, FromRow)]
pub(super) struct ItemRow {
    name: String,
    item_type: String,
    description: Option<String>,
    rule_name: Option<String>,
    data: Option<String>,
    system: bool,
    category: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ItemRow {
    pub(super) fn into_item(self) -> AppResult<Item> {
        Ok(Item::new(ItemInput {
            name: self.name,
            item_type: ItemType::from_str(self.item_type.as_str())?,
            description: self.description,
            rule_name: self.rule_name,
            data: self.data,
            system: self.system,
            category: self.category,
        })?
        .with_timestamps(Some(self.created_at), Some(self.updated_at)))
    }
}

#[derive(Debug, FromRow)]
pub(super) struct EdgeRow {
    parent: String,
    child: String,
}

impl EdgeRow {
    pub(super) fn into_edge(self) -> AppResult<Edge> {
        Edge::new(self.parent, self.child)
    }
}

#[derive(Debug, FromRow)]
pub(super) struct RuleRow {
    name: String,
    data: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RuleRow {
    pub(super) fn into_rule(self) -> AppResult<Rule> {
        Ok(Rule::new(self.name, self.data)?
            .with_timestamps(Some(self.created_at), Some(self.updated_at)))
    }
}

#[derive(Debug, FromRow)]
pub(super) struct AssignmentRow {
    user_id: String,
    item_name: String,
    created_at: DateTime<Utc>,
}

impl AssignmentRow {
    pub(super) fn into_assignment(self) -> AppResult<Assignment> {
        Ok(Assignment::new(self.user_id, self.item_name)?.with_created_at(Some(self.created_at)))
    }
}
