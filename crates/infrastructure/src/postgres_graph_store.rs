mod rows;


use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use rbacsync_application::{GraphSnapshot, GraphStore, GraphTransaction};
use rbacsync_core::{AppError, AppResult};
use rbacsync_domain::{Assignment, Edge, Item, ItemType, Rule};

use rows::{AssignmentRow, EdgeRow, ItemRow, RuleRow};

const ITEM_COLUMNS: &str = r#"
    name,
    type AS item_type,
    description,
    rule_name,
    data,
    system,
    category,
    created_at,
    updated_at
"#;

/// PostgreSQL-backed graph store.
#[derive(Clone)]
pub struct PostgresGraphStore {
    pool: PgPool,
}

impl PostgresGraphStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GraphStore for PostgresGraphStore {
    async fn begin(&self) -> AppResult<Box<dyn GraphTransaction>> {
        let transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        Ok(Box::new(PostgresGraphTransaction { transaction }))
    }

    async fn snapshot(&self) -> AppResult<GraphSnapshot> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin snapshot transaction: {error}"))
        })?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to configure snapshot transaction: {error}"))
            })?;

        let items = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM auth_item
            ORDER BY CASE type WHEN 'role' THEN 0 ELSE 1 END, name
            "#
        ))
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read items: {error}")))?
        .into_iter()
        .map(ItemRow::into_item)
        .collect::<AppResult<Vec<_>>>()?;

        let edges = sqlx::query_as::<_, EdgeRow>(
            r#"
            SELECT parent, child
            FROM auth_item_child
            ORDER BY parent, child
            "#,
        )
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read edges: {error}")))?
        .into_iter()
        .map(EdgeRow::into_edge)
        .collect::<AppResult<Vec<_>>>()?;

        let rules = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT name, data, created_at, updated_at
            FROM auth_rule
            ORDER BY name
            "#,
        )
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read rules: {error}")))?
        .into_iter()
        .map(RuleRow::into_rule)
        .collect::<AppResult<Vec<_>>>()?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to close snapshot transaction: {error}"))
        })?;

        Ok(GraphSnapshot {
            items,
            edges,
            rules,
        })
    }
}

/// Open PostgreSQL transaction; dropping it without commit rolls back.
struct PostgresGraphTransaction {
    transaction: Transaction<'static, Postgres>,
}

#[async_trait]
impl GraphTransaction for PostgresGraphTransaction {
    async fn find_item(&mut self, name: &str) -> AppResult<Option<Item>> {
        sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM auth_item WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find item '{name}': {error}")))?
        .map(ItemRow::into_item)
        .transpose()
    }

    async fn list_items(&mut self, item_type: ItemType) -> AppResult<Vec<Item>> {
        sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM auth_item WHERE type = $1 ORDER BY name"
        ))
        .bind(item_type.as_str())
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list items: {error}")))?
        .into_iter()
        .map(ItemRow::into_item)
        .collect()
    }

    async fn insert_item(&mut self, item: &Item) -> AppResult<Item> {
        sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO auth_item (name, type, description, rule_name, data, system, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item.name())
        .bind(item.item_type().as_str())
        .bind(item.description())
        .bind(item.rule_name())
        .bind(item.data())
        .bind(item.is_system())
        .bind(item.category())
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| map_write_error(error, "item", "insert item", item.name()))?
        .into_item()
    }

    async fn update_item(&mut self, item: &Item) -> AppResult<Item> {
        let current_type = sqlx::query_scalar::<_, String>(
            r#"
            SELECT type
            FROM auth_item
            WHERE name = $1
            FOR UPDATE
            "#,
        )
        .bind(item.name())
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock item: {error}")))?
        .ok_or_else(|| AppError::NotFound(format!("item '{}' does not exist", item.name())))?;

        if current_type != item.item_type().as_str() {
            return Err(AppError::constraint(
                "item",
                "type",
                format!(
                    "item '{}' is stored as {current_type} and cannot become {}",
                    item.name(),
                    item.item_type().as_str()
                ),
            ));
        }

        sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE auth_item
            SET description = $2,
                rule_name = $3,
                data = $4,
                system = $5,
                category = $6,
                updated_at = now()
            WHERE name = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item.name())
        .bind(item.description())
        .bind(item.rule_name())
        .bind(item.data())
        .bind(item.is_system())
        .bind(item.category())
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| map_write_error(error, "item", "update item", item.name()))?
        .into_item()
    }

    async fn delete_item(&mut self, item_type: ItemType, name: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM auth_item
            WHERE name = $1 AND type = $2
            "#,
        )
        .bind(name)
        .bind(item_type.as_str())
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete item '{name}': {error}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn edge_exists(&mut self, parent: &str, child: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM auth_item_child
                WHERE parent = $1 AND child = $2
            )
            "#,
        )
        .bind(parent)
        .bind(child)
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check edge: {error}")))
    }

    async fn insert_edge(&mut self, edge: &Edge) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_item_child (parent, child)
            VALUES ($1, $2)
            "#,
        )
        .bind(edge.parent())
        .bind(edge.child())
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| {
            map_write_error(
                error,
                "item_child",
                "insert edge",
                format!("{} -> {}", edge.parent(), edge.child()).as_str(),
            )
        })?;

        Ok(())
    }

    async fn list_edges(&mut self) -> AppResult<Vec<Edge>> {
        sqlx::query_as::<_, EdgeRow>(
            r#"
            SELECT parent, child
            FROM auth_item_child
            ORDER BY parent, child
            "#,
        )
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list edges: {error}")))?
        .into_iter()
        .map(EdgeRow::into_edge)
        .collect()
    }

    async fn delete_orphan_edges(
        &mut self,
        role_names: &[String],
        permission_names: &[String],
    ) -> AppResult<Vec<Edge>> {
        let mut edges = sqlx::query_as::<_, EdgeRow>(
            r#"
            DELETE FROM auth_item_child
            WHERE NOT (parent = ANY($1)) OR NOT (child = ANY($2))
            RETURNING parent, child
            "#,
        )
        .bind(role_names)
        .bind(permission_names)
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete orphan edges: {error}")))?
        .into_iter()
        .map(EdgeRow::into_edge)
        .collect::<AppResult<Vec<_>>>()?;
        edges.sort();

        Ok(edges)
    }

    async fn find_rule(&mut self, name: &str) -> AppResult<Option<Rule>> {
        sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT name, data, created_at, updated_at
            FROM auth_rule
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find rule '{name}': {error}")))?
        .map(RuleRow::into_rule)
        .transpose()
    }

    async fn insert_rule(&mut self, rule: &Rule) -> AppResult<Rule> {
        sqlx::query_as::<_, RuleRow>(
            r#"
            INSERT INTO auth_rule (name, data)
            VALUES ($1, $2)
            RETURNING name, data, created_at, updated_at
            "#,
        )
        .bind(rule.name())
        .bind(rule.data())
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| map_write_error(error, "rule", "insert rule", rule.name()))?
        .into_rule()
    }

    async fn update_rule(&mut self, rule: &Rule) -> AppResult<Rule> {
        sqlx::query_as::<_, RuleRow>(
            r#"
            UPDATE auth_rule
            SET data = $2,
                updated_at = now()
            WHERE name = $1
            RETURNING name, data, created_at, updated_at
            "#,
        )
        .bind(rule.name())
        .bind(rule.data())
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(|error| map_write_error(error, "rule", "update rule", rule.name()))?
        .ok_or_else(|| AppError::NotFound(format!("rule '{}' does not exist", rule.name())))?
        .into_rule()
    }

    async fn list_rules(&mut self) -> AppResult<Vec<Rule>> {
        sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT name, data, created_at, updated_at
            FROM auth_rule
            ORDER BY name
            "#,
        )
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list rules: {error}")))?
        .into_iter()
        .map(RuleRow::into_rule)
        .collect()
    }

    async fn assignment_exists(&mut self, user_id: &str, item_name: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM auth_assignment
                WHERE user_id = $1 AND item_name = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(item_name)
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check assignment: {error}")))
    }

    async fn insert_assignment(&mut self, assignment: &Assignment) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO auth_assignment (item_name, user_id)
            SELECT name, $2
            FROM auth_item
            WHERE name = $1 AND type = 'role'
            "#,
        )
        .bind(assignment.item_name())
        .bind(assignment.user_id())
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| {
            map_write_error(
                error,
                "assignment",
                "insert assignment",
                format!("{} -> {}", assignment.user_id(), assignment.item_name()).as_str(),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::constraint(
                "assignment",
                "item_name",
                format!("role '{}' does not exist", assignment.item_name()),
            ));
        }

        Ok(())
    }

    async fn list_assignments(&mut self) -> AppResult<Vec<Assignment>> {
        sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT user_id, item_name, created_at
            FROM auth_assignment
            ORDER BY user_id, item_name
            "#,
        )
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list assignments: {error}")))?
        .into_iter()
        .map(AssignmentRow::into_assignment)
        .collect()
    }

    async fn delete_orphan_assignments(
        &mut self,
        role_names: &[String],
    ) -> AppResult<Vec<Assignment>> {
        sqlx::query_as::<_, AssignmentRow>(
            r#"
            DELETE FROM auth_assignment
            WHERE NOT (item_name = ANY($1))
            RETURNING user_id, item_name, created_at
            "#,
        )
        .bind(role_names)
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete orphan assignments: {error}"))
        })?
        .into_iter()
        .map(AssignmentRow::into_assignment)
        .collect()
    }

    async fn clear_all(&mut self) -> AppResult<()> {
        sqlx::query("TRUNCATE auth_assignment, auth_item_child, auth_item, auth_rule")
            .execute(&mut *self.transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to clear graph: {error}")))?;

        debug!("cleared all graph collections");
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.transaction.rollback().await.map_err(|error| {
            AppError::Internal(format!("failed to roll back transaction: {error}"))
        })
    }
}

fn map_write_error(error: sqlx::Error, entity: &str, action: &str, key: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        let field = constraint_field(database_error.constraint());
        match database_error.code().as_deref() {
            Some("23505") => {
                return AppError::constraint(entity, field, format!("'{key}' already exists"));
            }
            Some("23503") => {
                return AppError::constraint(
                    entity,
                    field,
                    format!("'{key}' references a missing entry"),
                );
            }
            Some("23514") => {
                return AppError::constraint(
                    entity,
                    field,
                    format!("'{key}' violates a check constraint"),
                );
            }
            _ => {}
        }
    }

    AppError::Internal(format!("failed to {action} '{key}': {error}"))
}

fn constraint_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("auth_item_rule_name_fkey") => "rule_name",
        Some("auth_item_child_parent_fkey" | "auth_item_child_pkey") => "parent",
        Some("auth_item_child_child_fkey" | "auth_item_child_check") => "child",
        Some("auth_item_check" | "auth_item_category_check") => "category",
        Some("auth_item_type_check") => "type",
        Some("auth_assignment_item_name_fkey") => "item_name",
        Some("auth_assignment_pkey") => "user_id",
        _ => "name",
    }
}
