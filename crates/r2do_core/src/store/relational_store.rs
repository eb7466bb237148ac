//! Relational (SQLite) backend.
//!
//! # Responsibility
//! - Persist categories and tasks as independent constrained rows.
//! - Apply every mutation durably as it happens (write-through).
//! - Answer store-level lookups without loading the whole graph.
//!
//! # Invariants
//! - Name/description uniqueness, non-empty and length checks are declared
//!   in the schema and hold even for writes that bypass `State`.
//! - Partial unique indexes allow at most one `is_current = 1` row per table;
//!   every write that sets a current flag clears the previous holder first,
//!   inside the same transaction.
//! - Rows are read in insertion order (`position ASC`).

use super::{StateSnapshot, StateStore, StoreError, StoreResult};
use crate::db::migrations::{latest_version, schema_version};
use crate::model::category::{Category, CategoryId};
use crate::model::task::{Task, TaskId};
use crate::model::Timestamp;
use chrono::DateTime;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    category_uuid,
    description,
    done,
    is_current,
    created_at,
    completed_at
FROM tasks";

/// SQLite-backed store operating on a caller-owned, migrated connection.
pub struct RelationalStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> RelationalStore<'conn> {
    /// Creates the store from a connection returned by `open_db*`.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let expected_version = latest_version();
        let actual_version = schema_version(conn)?;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    /// Returns whether a category with `name` exists.
    pub fn contains_category(&self, name: &str) -> StoreResult<bool> {
        Ok(self.find_category_id(name)?.is_some())
    }

    /// Looks up a category id by exact name.
    pub fn find_category_id(&self, name: &str) -> StoreResult<Option<CategoryId>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT uuid FROM categories WHERE name = ?1;",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        value.map(|text| parse_uuid(&text, "categories.uuid")).transpose()
    }

    /// Returns the id of the row flagged current in `categories`.
    pub fn current_category_id(&self) -> StoreResult<Option<CategoryId>> {
        current_id(self.conn, "categories")
    }

    /// Returns the id of the row flagged current in `tasks`.
    pub fn current_task_id(&self) -> StoreResult<Option<TaskId>> {
        current_id(self.conn, "tasks")
    }

    /// Lists completed tasks across all categories in insertion order.
    pub fn completed_tasks(&self) -> StoreResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                t.uuid AS uuid,
                t.category_uuid AS category_uuid,
                t.description AS description,
                t.done AS done,
                t.is_current AS is_current,
                t.created_at AS created_at,
                t.completed_at AS completed_at
             FROM tasks t
             JOIN categories c ON c.uuid = t.category_uuid
             WHERE t.done = 1
             ORDER BY c.position ASC, t.position ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?.task);
        }
        Ok(tasks)
    }
}

impl StateStore for RelationalStore<'_> {
    fn load(&mut self) -> StoreResult<StateSnapshot> {
        let mut snapshot = StateSnapshot::default();
        let mut index_by_id: HashMap<CategoryId, usize> = HashMap::new();

        {
            let mut stmt = self.conn.prepare(
                "SELECT uuid, name, is_current
                 FROM categories
                 ORDER BY position ASC, uuid ASC;",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let uuid = parse_uuid(&row.get::<_, String>("uuid")?, "categories.uuid")?;
                if parse_flag(row, "is_current")? {
                    snapshot.current_category = Some(uuid);
                }
                index_by_id.insert(uuid, snapshot.categories.len());
                snapshot
                    .categories
                    .push(Category::with_id(uuid, row.get::<_, String>("name")?));
            }
        }

        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             ORDER BY category_uuid ASC, position ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let parsed = parse_task_row(row)?;
            let index = index_by_id.get(&parsed.category).copied().ok_or_else(|| {
                StoreError::InvalidData(format!(
                    "task {} references missing category {}",
                    parsed.task.uuid, parsed.category
                ))
            })?;
            let category = &mut snapshot.categories[index];
            if parsed.is_current {
                category.current_task = Some(parsed.task.uuid);
            }
            category.tasks.push(parsed.task);
        }

        info!(
            "event=store_load module=store backend=relational status=ok categories={}",
            snapshot.categories.len()
        );
        Ok(snapshot)
    }

    fn save(&mut self, _snapshot: &StateSnapshot) -> StoreResult<()> {
        debug!("event=store_save module=store backend=relational status=skipped reason=write_through");
        Ok(())
    }

    fn create_category(&mut self, category: &Category, make_current: bool) -> StoreResult<()> {
        category.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if make_current {
            tx.execute(
                "UPDATE categories SET is_current = 0 WHERE is_current = 1;",
                [],
            )?;
            tx.execute("UPDATE tasks SET is_current = 0 WHERE is_current = 1;", [])?;
        }
        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM categories;",
            [],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO categories (uuid, name, is_current, position)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                category.uuid.to_string(),
                category.name.as_str(),
                bool_to_int(make_current),
                position,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_category(&mut self, category: &Category) -> StoreResult<()> {
        category.validate()?;

        let changed = self.conn.execute(
            "UPDATE categories SET name = ?2 WHERE uuid = ?1;",
            params![category.uuid.to_string(), category.name.as_str()],
        )?;
        ensure_changed(changed, "category", category.uuid)
    }

    fn destroy_category(&mut self, id: CategoryId) -> StoreResult<()> {
        // Task rows and any current flag go with the category row.
        let changed = self
            .conn
            .execute("DELETE FROM categories WHERE uuid = ?1;", [id.to_string()])?;
        ensure_changed(changed, "category", id)
    }

    fn set_current_category(&mut self, id: Option<CategoryId>) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        match id {
            Some(id) => {
                let id_text = id.to_string();
                tx.execute(
                    "UPDATE categories SET is_current = 0 WHERE is_current = 1 AND uuid <> ?1;",
                    [id_text.as_str()],
                )?;
                let changed = tx.execute(
                    "UPDATE categories SET is_current = 1 WHERE uuid = ?1;",
                    [id_text.as_str()],
                )?;
                ensure_changed(changed, "category", id)?;
                tx.execute(
                    "UPDATE tasks SET is_current = 0 WHERE is_current = 1 AND category_uuid <> ?1;",
                    [id_text.as_str()],
                )?;
            }
            None => {
                tx.execute(
                    "UPDATE categories SET is_current = 0 WHERE is_current = 1;",
                    [],
                )?;
                tx.execute("UPDATE tasks SET is_current = 0 WHERE is_current = 1;", [])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn create_task(
        &mut self,
        category: CategoryId,
        task: &Task,
        make_current: bool,
    ) -> StoreResult<()> {
        task.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let category_text = category.to_string();
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE uuid = ?1);",
            [category_text.as_str()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(StoreError::NotFound {
                entity: "category",
                id: category,
            });
        }
        if make_current {
            tx.execute("UPDATE tasks SET is_current = 0 WHERE is_current = 1;", [])?;
        }
        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM tasks WHERE category_uuid = ?1;",
            [category_text.as_str()],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO tasks (
                uuid,
                category_uuid,
                description,
                done,
                is_current,
                position,
                created_at,
                completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                task.uuid.to_string(),
                category_text,
                task.description.as_str(),
                bool_to_int(task.done),
                bool_to_int(make_current),
                position,
                task.created_at.timestamp_millis(),
                task.completed_at.map(|at| at.timestamp_millis()),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_task(&mut self, task: &Task) -> StoreResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                description = ?2,
                done = ?3,
                completed_at = ?4
             WHERE uuid = ?1;",
            params![
                task.uuid.to_string(),
                task.description.as_str(),
                bool_to_int(task.done),
                task.completed_at.map(|at| at.timestamp_millis()),
            ],
        )?;
        ensure_changed(changed, "task", task.uuid)
    }

    fn destroy_task(&mut self, id: TaskId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE uuid = ?1;", [id.to_string()])?;
        ensure_changed(changed, "task", id)
    }

    fn set_current_task(&mut self, id: Option<TaskId>) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let Some(id) = id else {
            tx.execute("UPDATE tasks SET is_current = 0 WHERE is_current = 1;", [])?;
            tx.commit()?;
            return Ok(());
        };

        let id_text = id.to_string();
        let category_text: Option<String> = tx
            .query_row(
                "SELECT category_uuid FROM tasks WHERE uuid = ?1;",
                [id_text.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let category_text = category_text.ok_or(StoreError::NotFound { entity: "task", id })?;

        tx.execute(
            "UPDATE tasks SET is_current = 0 WHERE is_current = 1 AND uuid <> ?1;",
            [id_text.as_str()],
        )?;
        tx.execute(
            "UPDATE tasks SET is_current = 1 WHERE uuid = ?1;",
            [id_text.as_str()],
        )?;
        tx.execute(
            "UPDATE categories SET is_current = 0 WHERE is_current = 1 AND uuid <> ?1;",
            [category_text.as_str()],
        )?;
        tx.execute(
            "UPDATE categories SET is_current = 1 WHERE uuid = ?1;",
            [category_text.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

struct TaskRow {
    category: CategoryId,
    is_current: bool,
    task: Task,
}

fn parse_task_row(row: &Row<'_>) -> StoreResult<TaskRow> {
    let uuid = parse_uuid(&row.get::<_, String>("uuid")?, "tasks.uuid")?;
    let category = parse_uuid(
        &row.get::<_, String>("category_uuid")?,
        "tasks.category_uuid",
    )?;
    let created_at = parse_millis(row.get("created_at")?, "tasks.created_at")?;
    let completed_at = row
        .get::<_, Option<i64>>("completed_at")?
        .map(|value| parse_millis(value, "tasks.completed_at"))
        .transpose()?;

    let task = Task {
        uuid,
        description: row.get("description")?,
        done: parse_flag(row, "done")?,
        created_at,
        completed_at,
    };
    Ok(TaskRow {
        category,
        is_current: parse_flag(row, "is_current")?,
        task,
    })
}

fn current_id(conn: &Connection, table: &'static str) -> StoreResult<Option<Uuid>> {
    let value: Option<String> = conn
        .query_row(
            &format!("SELECT uuid FROM {table} WHERE is_current = 1;"),
            [],
            |row| row.get(0),
        )
        .optional()?;
    value.map(|text| parse_uuid(&text, table)).transpose()
}

fn ensure_changed(changed: usize, entity: &'static str, id: Uuid) -> StoreResult<()> {
    if changed == 0 {
        return Err(StoreError::NotFound { entity, id });
    }
    Ok(())
}

fn parse_uuid(value: &str, column: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn parse_millis(value: i64, column: &str) -> StoreResult<Timestamp> {
    DateTime::from_timestamp_millis(value).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid timestamp `{value}` in {column}"))
    })
}

fn parse_flag(row: &Row<'_>, column: &str) -> StoreResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
