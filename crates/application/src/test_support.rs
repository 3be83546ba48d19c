use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use rbacsync_core::AppResult;
use rbacsync_domain::{Assignment, DiscoveredPermission, Edge, Item, ItemInput, ItemType, Rule};

use crate::document_ports::{Document, DocumentKey, DocumentStore};
use crate::discovery_ports::PermissionDiscovery;
use crate::graph_ports::{GraphSnapshot, GraphStore, GraphTransaction};

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeGraph {
    pub(crate) items: BTreeMap<String, Item>,
    pub(crate) edges: BTreeSet<Edge>,
    pub(crate) rules: BTreeMap<String, Rule>,
    pub(crate) assignments: Vec<Assignment>,
}

impl FakeGraph {
    pub(crate) fn item_names(&self, item_type: ItemType) -> Vec<String> {
        self.items
            .values()
            .filter(|item| item.item_type() == item_type)
            .map(|item| item.name().to_owned())
            .collect()
    }

    pub(crate) fn edge_pairs(&self) -> Vec<(String, String)> {
        self.edges
            .iter()
            .map(|edge| (edge.parent().to_owned(), edge.child().to_owned()))
            .collect()
    }
}

/// Plain working-copy store; key and reference constraints are covered by
/// the infrastructure adapters' own tests.
#[derive(Clone, Default)]
pub(crate) struct FakeGraphStore {
    state: Arc<Mutex<FakeGraph>>,
}

impl FakeGraphStore {
    pub(crate) fn with_graph(graph: FakeGraph) -> Self {
        Self {
            state: Arc::new(Mutex::new(graph)),
        }
    }

    pub(crate) async fn graph(&self) -> FakeGraph {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl GraphStore for FakeGraphStore {
    async fn begin(&self) -> AppResult<Box<dyn GraphTransaction>> {
        let working = self.state.lock().await.clone();
        Ok(Box::new(FakeTransaction {
            state: Arc::clone(&self.state),
            working,
        }))
    }

    async fn snapshot(&self) -> AppResult<GraphSnapshot> {
        let graph = self.state.lock().await.clone();
        let mut items = graph.items.into_values().collect::<Vec<_>>();
        items.sort_by(|left, right| {
            (left.item_type(), left.name()).cmp(&(right.item_type(), right.name()))
        });

        Ok(GraphSnapshot {
            items,
            edges: graph.edges.into_iter().collect(),
            rules: graph.rules.into_values().collect(),
        })
    }
}

struct FakeTransaction {
    state: Arc<Mutex<FakeGraph>>,
    working: FakeGraph,
}

#[async_trait]
impl GraphTransaction for FakeTransaction {
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
        let now = Some(Utc::now());
        let stored = item.clone().with_timestamps(now, now);
        self.working
            .items
            .insert(item.name().to_owned(), stored.clone());
        Ok(stored)
    }

    async fn update_item(&mut self, item: &Item) -> AppResult<Item> {
        let created_at = self
            .working
            .items
            .get(item.name())
            .and_then(Item::created_at);
        let stored = item.clone().with_timestamps(created_at, Some(Utc::now()));
        self.working
            .items
            .insert(item.name().to_owned(), stored.clone());
        Ok(stored)
    }

    async fn delete_item(&mut self, item_type: ItemType, name: &str) -> AppResult<bool> {
        if !self
            .working
            .items
            .get(name)
            .is_some_and(|item| item.item_type() == item_type)
        {
            return Ok(false);
        }

        self.working.items.remove(name);
        self.working
            .edges
            .retain(|edge| edge.parent() != name && edge.child() != name);
        self.working
            .assignments
            .retain(|assignment| assignment.item_name() != name);
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
        self.working.edges.insert(edge.clone());
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
        let (orphans, kept): (Vec<Edge>, Vec<Edge>) =
            self.working.edges.iter().cloned().partition(|edge| {
                !role_names.iter().any(|name| name == edge.parent())
                    || !permission_names.iter().any(|name| name == edge.child())
            });
        self.working.edges = kept.into_iter().collect();
        Ok(orphans)
    }

    async fn find_rule(&mut self, name: &str) -> AppResult<Option<Rule>> {
        Ok(self.working.rules.get(name).cloned())
    }

    async fn insert_rule(&mut self, rule: &Rule) -> AppResult<Rule> {
        self.working
            .rules
            .insert(rule.name().to_owned(), rule.clone());
        Ok(rule.clone())
    }

    async fn update_rule(&mut self, rule: &Rule) -> AppResult<Rule> {
        self.working
            .rules
            .insert(rule.name().to_owned(), rule.clone());
        Ok(rule.clone())
    }

    async fn list_rules(&mut self) -> AppResult<Vec<Rule>> {
        Ok(self.working.rules.values().cloned().collect())
    }

    async fn assignment_exists(&mut self, user_id: &str, item_name: &str) -> AppResult<bool> {
        Ok(self.working.assignments.iter().any(|assignment| {
            assignment.user_id() == user_id && assignment.item_name() == item_name
        }))
    }

    async fn insert_assignment(&mut self, assignment: &Assignment) -> AppResult<()> {
        self.working.assignments.push(assignment.clone());
        Ok(())
    }

    async fn list_assignments(&mut self) -> AppResult<Vec<Assignment>> {
        Ok(self.working.assignments.clone())
    }

    async fn delete_orphan_assignments(
        &mut self,
        role_names: &[String],
    ) -> AppResult<Vec<Assignment>> {
        let (orphans, kept): (Vec<Assignment>, Vec<Assignment>) = self
            .working
            .assignments
            .iter()
            .cloned()
            .partition(|assignment| {
                !role_names
                    .iter()
                    .any(|name| name == assignment.item_name())
            });
        self.working.assignments = kept;
        Ok(orphans)
    }

    async fn clear_all(&mut self) -> AppResult<()> {
        self.working = FakeGraph::default();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        *self.state.lock().await = self.working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeDocumentStore {
    documents: Mutex<HashMap<DocumentKey, Document>>,
}

impl FakeDocumentStore {
    pub(crate) async fn document(&self, key: &DocumentKey) -> Option<Document> {
        self.documents.lock().await.get(key).cloned()
    }

    pub(crate) async fn put(&self, key: DocumentKey, document: Document) {
        self.documents.lock().await.insert(key, document);
    }
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn load(&self, key: &DocumentKey) -> AppResult<Option<Document>> {
        Ok(self.documents.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &DocumentKey, document: &Document) -> AppResult<()> {
        self.documents
            .lock()
            .await
            .insert(key.clone(), document.clone());
        Ok(())
    }

    async fn list_keys(&self) -> AppResult<Vec<DocumentKey>> {
        let mut keys = self.documents.lock().await.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        Ok(keys)
    }
}

pub(crate) struct FakeDiscovery {
    pub(crate) permissions: Vec<DiscoveredPermission>,
}

#[async_trait]
impl PermissionDiscovery for FakeDiscovery {
    async fn discover(&self) -> AppResult<Vec<DiscoveredPermission>> {
        Ok(self.permissions.clone())
    }
}

pub(crate) fn role(name: &str, system: bool) -> Item {
    Item::new(ItemInput {
        name: name.to_owned(),
        item_type: ItemType::Role,
        description: Some(format!("{name} role")),
        rule_name: None,
        data: None,
        system,
        category: None,
    })
    .unwrap_or_else(|_| unreachable!())
}

pub(crate) fn permission(name: &str, category: &str, description: &str) -> Item {
    Item::new(ItemInput {
        name: name.to_owned(),
        item_type: ItemType::Permission,
        description: Some(description.to_owned()),
        rule_name: None,
        data: None,
        system: false,
        category: Some(category.to_owned()),
    })
    .unwrap_or_else(|_| unreachable!())
}

pub(crate) fn edge(parent: &str, child: &str) -> Edge {
    Edge::new(parent, child).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn graph_of(items: Vec<Item>, edges: Vec<Edge>) -> FakeGraph {
    FakeGraph {
        items: items
            .into_iter()
            .map(|item| (item.name().to_owned(), item))
            .collect(),
        edges: edges.into_iter().collect(),
        ..FakeGraph::default()
    }
}

pub(crate) fn document_of(value: serde_json::Value) -> Document {
    let serde_json::Value::Array(values) = value else {
        unreachable!()
    };

    Document::new(
        values
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::Object(record) => Some(record),
                _ => None,
            })
            .collect(),
    )
}
