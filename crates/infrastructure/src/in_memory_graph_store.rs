#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use rbacsync_application::{GraphSnapshot, GraphStore, GraphTransaction};
use rbacsync_core::{AppError, AppResult};
use rbacsync_domain::{Assignment, Edge, Item, ItemType, Rule};

#[derive(Debug, Clone, Default)]
struct GraphState {
    items: BTreeMap<String, Item>,
    edges: BTreeSet<Edge>,
    rules: BTreeMap<String, Rule>,
    assignments: BTreeMap<(String, String), Assignment>,
}

/// In-memory graph store.
///
/// A transaction owns the store lock until it is committed or dropped, so
/// transactions are serialized and `snapshot` waits for an open one.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphStore {
    state: Arc<Mutex<GraphState>>,
}

impl InMemoryGraphStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn begin(&self) -> AppResult<Box<dyn GraphTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(InMemoryGraphTransaction { guard, working }))
    }

    async fn snapshot(&self) -> AppResult<GraphSnapshot> {
        let state = self.state.lock().await;
        let mut items = state.items.values().cloned().collect::<Vec<_>>();
        items.sort_by(|left, right| {
            (left.item_type(), left.name()).cmp(&(right.item_type(), right.name()))
        });

        Ok(GraphSnapshot {
            items,
            edges: state.edges.iter().cloned().collect(),
            rules: state.rules.values().cloned().collect(),
        })
    }
}

struct InMemoryGraphTransaction {
    guard: OwnedMutexGuard<GraphState>,
    working: GraphState,
}

impl InMemoryGraphTransaction {
    fn check_rule_reference(&self, item: &Item) -> AppResult<()> {
        match item.rule_name() {
            Some(rule_name) if !self.working.rules.contains_key(rule_name) => {
                Err(AppError::constraint(
                    "item",
                    "rule_name",
                    format!("rule '{rule_name}' does not exist"),
                ))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl GraphTransaction for InMemoryGraphTransaction {
    async fn find_item(&mut self, name: &str) -> AppResult<Option<Item>> {
        Ok(self.working.items.get(name).cloned())
    }

    async fn list_items(&mut self, item_type: ItemType) -> AppResult<Vec<Item>> {
        Ok(self
            .working
            .items
            .values()
            .filter(|item| item.item_type() == item_type)
            .cloned()
            .collect())
    }

    async fn insert_item(&mut self, item: &Item) -> AppResult<Item> {
        if self.working.items.contains_key(item.name()) {
            return Err(AppError::constraint(
                "item",
                "name",
                format!("'{}' already exists", item.name()),
            ));
        }
        self.check_rule_reference(item)?;

        let now = Some(Utc::now());
        let stored = item.clone().with_timestamps(now, now);
        self.working
            .items
            .insert(item.name().to_owned(), stored.clone());

        Ok(stored)
    }

    async fn update_item(&mut self, item: &Item) -> AppResult<Item> {
        let Some(current) = self.working.items.get(item.name()) else {
            return Err(AppError::NotFound(format!(
                "item '{}' does not exist",
                item.name()
            )));
        };
        if current.item_type() != item.item_type() {
            return Err(AppError::constraint(
                "item",
                "type",
                format!(
                    "item '{}' is stored as {} and cannot become {}",
                    item.name(),
                    current.item_type().as_str(),
                    item.item_type().as_str()
                ),
            ));
        }
        let created_at = current.created_at();
        self.check_rule_reference(item)?;

        let stored = item
            .clone()
            .with_timestamps(created_at, Some(Utc::now()));
        self.working
            .items
            .insert(item.name().to_owned(), stored.clone());

        Ok(stored)
    }

    async fn delete_item(&mut self, item_type: ItemType, name: &str) -> AppResult<bool> {
        let matches_type = self
            .working
            .items
            .get(name)
            .is_some_and(|item| item.item_type() == item_type);
        if !matches_type {
            return Ok(false);
        }

        self.working.items.remove(name);
        self.working
            .edges
            .retain(|edge| edge.parent() != name && edge.child() != name);
        self.working
            .assignments
            .retain(|_, assignment| assignment.item_name() != name);

        Ok(true)
    }

    async fn edge_exists(&mut self, parent: &str, child: &str) -> AppResult<bool> {
        Ok(self
            .working
            .edges
            .iter()
            .any(|edge| edge.parent() == parent && edge.child() == child))
    }

    async fn insert_edge(&mut self, edge: &Edge) -> AppResult<()> {
        for (field, name) in [("parent", edge.parent()), ("child", edge.child())] {
            if !self.working.items.contains_key(name) {
                return Err(AppError::constraint(
                    "item_child",
                    field,
                    format!("item '{name}' does not exist"),
                ));
            }
        }

        if !self.working.edges.insert(edge.clone()) {
            return Err(AppError::constraint(
                "item_child",
                "parent",
                format!("'{} -> {}' already exists", edge.parent(), edge.child()),
            ));
        }

        Ok(())
    }

    async fn list_edges(&mut self) -> AppResult<Vec<Edge>> {
        Ok(self.working.edges.iter().cloned().collect())
    }

    async fn delete_orphan_edges(
        &mut self,
        role_names: &[String],
        permission_names: &[String],
    ) -> AppResult<Vec<Edge>> {
        let roles = role_names.iter().map(String::as_str).collect::<BTreeSet<_>>();
        let permissions = permission_names
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>();

        let orphans = self
            .working
            .edges
            .iter()
            .filter(|edge| !roles.contains(edge.parent()) || !permissions.contains(edge.child()))
            .cloned()
            .collect::<Vec<_>>();
        for orphan in &orphans {
            self.working.edges.remove(orphan);
        }

        Ok(orphans)
    }

    async fn find_rule(&mut self, name: &str) -> AppResult<Option<Rule>> {
        Ok(self.working.rules.get(name).cloned())
    }

    async fn insert_rule(&mut self, rule: &Rule) -> AppResult<Rule> {
        if self.working.rules.contains_key(rule.name()) {
            return Err(AppError::constraint(
                "rule",
                "name",
                format!("'{}' already exists", rule.name()),
            ));
        }

        let now = Some(Utc::now());
        let stored = rule.clone().with_timestamps(now, now);
        self.working
            .rules
            .insert(rule.name().to_owned(), stored.clone());

        Ok(stored)
    }

    async fn update_rule(&mut self, rule: &Rule) -> AppResult<Rule> {
        let Some(current) = self.working.rules.get(rule.name()) else {
            return Err(AppError::NotFound(format!(
                "rule '{}' does not exist",
                rule.name()
            )));
        };

        let stored = rule
            .clone()
            .with_timestamps(current.created_at(), Some(Utc::now()));
        self.working
            .rules
            .insert(rule.name().to_owned(), stored.clone());

        Ok(stored)
    }

    async fn list_rules(&mut self) -> AppResult<Vec<Rule>> {
        Ok(self.working.rules.values().cloned().collect())
    }

    async fn assignment_exists(&mut self, user_id: &str, item_name: &str) -> AppResult<bool> {
        Ok(self
            .working
            .assignments
            .contains_key(&(user_id.to_owned(), item_name.to_owned())))
    }

    async fn insert_assignment(&mut self, assignment: &Assignment) -> AppResult<()> {
        let is_role = self
            .working
            .items
            .get(assignment.item_name())
            .is_some_and(Item::is_role);
        if !is_role {
            return Err(AppError::constraint(
                "assignment",
                "item_name",
                format!("role '{}' does not exist", assignment.item_name()),
            ));
        }

        let key = (
            assignment.user_id().to_owned(),
            assignment.item_name().to_owned(),
        );
        if self.working.assignments.contains_key(&key) {
            return Err(AppError::constraint(
                "assignment",
                "user_id",
                format!(
                    "'{} -> {}' already exists",
                    assignment.user_id(),
                    assignment.item_name()
                ),
            ));
        }

        self.working.assignments.insert(
            key,
            assignment.clone().with_created_at(Some(Utc::now())),
        );

        Ok(())
    }

    async fn list_assignments(&mut self) -> AppResult<Vec<Assignment>> {
        Ok(self.working.assignments.values().cloned().collect())
    }

    async fn delete_orphan_assignments(
        &mut self,
        role_names: &[String],
    ) -> AppResult<Vec<Assignment>> {
        let roles = role_names.iter().map(String::as_str).collect::<BTreeSet<_>>();
        let orphan_keys = self
            .working
            .assignments
            .iter()
            .filter(|(_, assignment)| !roles.contains(assignment.item_name()))
            .map(|(key, _)| key.clone())
            .collect::<Vec<_>>();

        Ok(orphan_keys
            .iter()
            .filter_map(|key| self.working.assignments.remove(key))
            .collect())
    }

    async fn clear_all(&mut self) -> AppResult<()> {
        self.working = GraphState::default();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
