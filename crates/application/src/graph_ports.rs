use async_trait::async_trait;

use rbacsync_core::AppResult;
use rbacsync_domain::{Assignment, Edge, Item, ItemType, Rule};

/// Consistent read of the graph used by exports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphSnapshot {
    /// All items ordered by type then name.
    pub items: Vec<Item>,
    /// All edges ordered by parent then child.
    pub edges: Vec<Edge>,
    /// All rules ordered by name.
    pub rules: Vec<Rule>,
}

/// Persistence port owning items, edges, rules and assignments.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Opens a transaction; dropping it without commit rolls back.
    async fn begin(&self) -> AppResult<Box<dyn GraphTransaction>>;

    /// Reads the whole graph under one consistent view.
    async fn snapshot(&self) -> AppResult<GraphSnapshot>;
}

/// Transaction handle through which every graph mutation flows.
///
/// Writes that would duplicate a key or leave a dangling reference fail with
/// `AppError::ConstraintViolation`.
#[async_trait]
pub trait GraphTransaction: Send {
    /// Finds an item of any type by name.
    async fn find_item(&mut self, name: &str) -> AppResult<Option<Item>>;

    /// Lists items of one type ordered by name.
    async fn list_items(&mut self, item_type: ItemType) -> AppResult<Vec<Item>>;

    /// Inserts a new item and returns it with store timestamps.
    async fn insert_item(&mut self, item: &Item) -> AppResult<Item>;

    /// Overwrites an existing item and returns it with store timestamps.
    async fn update_item(&mut self, item: &Item) -> AppResult<Item>;

    /// Deletes an item of the given type, cascading to edges and assignments.
    async fn delete_item(&mut self, item_type: ItemType, name: &str) -> AppResult<bool>;

    /// Returns whether the edge exists.
    async fn edge_exists(&mut self, parent: &str, child: &str) -> AppResult<bool>;

    /// Inserts an edge between two existing items.
    async fn insert_edge(&mut self, edge: &Edge) -> AppResult<()>;

    /// Lists edges ordered by parent then child.
    async fn list_edges(&mut self) -> AppResult<Vec<Edge>>;

    /// Deletes edges whose parent is not a listed role or whose child is not a listed permission.
    async fn delete_orphan_edges(
        &mut self,
        role_names: &[String],
        permission_names: &[String],
    ) -> AppResult<Vec<Edge>>;

    /// Finds a rule by name.
    async fn find_rule(&mut self, name: &str) -> AppResult<Option<Rule>>;

    /// Inserts a new rule.
    async fn insert_rule(&mut self, rule: &Rule) -> AppResult<Rule>;

    /// Overwrites an existing rule.
    async fn update_rule(&mut self, rule: &Rule) -> AppResult<Rule>;

    /// Lists rules ordered by name.
    async fn list_rules(&mut self) -> AppResult<Vec<Rule>>;

    /// Returns whether the user is bound to the role.
    async fn assignment_exists(&mut self, user_id: &str, item_name: &str) -> AppResult<bool>;

    /// Binds a user to an existing role.
    async fn insert_assignment(&mut self, assignment: &Assignment) -> AppResult<()>;

    /// Lists assignments ordered by user then role.
    async fn list_assignments(&mut self) -> AppResult<Vec<Assignment>>;

    /// Deletes assignments whose role is not listed.
    async fn delete_orphan_assignments(
        &mut self,
        role_names: &[String],
    ) -> AppResult<Vec<Assignment>>;

    /// Removes every item, edge, rule and assignment.
    async fn clear_all(&mut self) -> AppResult<()>;

    /// Makes all writes of this transaction durable.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discards all writes of this transaction.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
