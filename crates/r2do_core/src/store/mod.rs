//! Persistence contract for the category/task graph and its backends.
//!
//! # Responsibility
//! - Define `StateStore`, the one seam `State` persists through.
//! - Provide the snapshot (whole-document) and relational (SQLite) backends.
//!
//! # Invariants
//! - Both backends observe the same ordering, current-selection and error
//!   semantics for the same sequence of calls.
//! - A failed store call leaves the durable medium unchanged.
//! - Every call that sets a current entity clears the previous holder in the
//!   same logical operation.

pub mod relational_store;
pub mod snapshot_store;

use crate::db::DbError;
use crate::model::category::{Category, CategoryId};
use crate::model::task::{Task, TaskId};
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failure. Apart from `ConstraintViolation` and `NotFound`,
/// these are unrecoverable for the running invocation.
#[derive(Debug)]
pub enum StoreError {
    /// Record failed field validation before reaching the store.
    Validation(ValidationError),
    /// SQLite bootstrap or query failure.
    Db(DbError),
    /// Snapshot file could not be read or written.
    Io(std::io::Error),
    /// Snapshot document could not be encoded or decoded.
    Serialization(serde_json::Error),
    /// The store rejected a write on a declared constraint.
    ConstraintViolation(String),
    /// Write targeted a record that does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to the domain model.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "snapshot file error: {err}"),
            Self::Serialization(err) => write!(f, "snapshot encoding error: {err}"),
            Self::ConstraintViolation(message) => {
                write!(f, "store constraint violated: {message}")
            }
            Self::NotFound { entity, id } => write!(f, "{entity} not found in store: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "relational store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(message.unwrap_or_else(|| code.to_string()))
            }
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Whole-graph view exchanged with a store on load and save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Categories in insertion order, each with its tasks in insertion order.
    pub categories: Vec<Category>,
    /// The current category, if any.
    pub current_category: Option<CategoryId>,
}

/// Storage backend used by `State`.
///
/// Whole-graph backends treat the per-entity calls as change notifications
/// and write on `save`; record-oriented backends apply each call durably and
/// treat `save` as a flush.
pub trait StateStore {
    /// Reads the full graph. A store with no data yields an empty snapshot.
    fn load(&mut self) -> StoreResult<StateSnapshot>;
    /// Makes `snapshot` durable if anything changed since the last load.
    fn save(&mut self, snapshot: &StateSnapshot) -> StoreResult<()>;

    /// Persists a new category, optionally making it the current one.
    fn create_category(&mut self, category: &Category, make_current: bool) -> StoreResult<()>;
    /// Persists a category's own fields (not its tasks).
    fn update_category(&mut self, category: &Category) -> StoreResult<()>;
    /// Deletes a category together with its tasks.
    fn destroy_category(&mut self, id: CategoryId) -> StoreResult<()>;
    /// Moves the current-category selection; tasks outside the new current
    /// category lose their current flag.
    fn set_current_category(&mut self, id: Option<CategoryId>) -> StoreResult<()>;

    /// Persists a new task owned by `category`, optionally making it current.
    fn create_task(
        &mut self,
        category: CategoryId,
        task: &Task,
        make_current: bool,
    ) -> StoreResult<()>;
    /// Persists a task's own fields.
    fn update_task(&mut self, task: &Task) -> StoreResult<()>;
    fn destroy_task(&mut self, id: TaskId) -> StoreResult<()>;
    /// Moves the current-task selection; selecting a task also selects its
    /// category.
    fn set_current_task(&mut self, id: Option<TaskId>) -> StoreResult<()>;
}
