//! Core domain logic for r2do.
//! This crate is the single source of truth for category/task invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::{Category, CategoryError, CategoryId};
pub use model::task::{Task, TaskId, MAX_DESCRIPTION_CHARS};
pub use model::validation::ValidationError;
pub use model::{now_timestamp, Timestamp};
pub use service::state::{required_arg, NewCategory, State, StateError, StateResult};
pub use store::relational_store::RelationalStore;
pub use store::snapshot_store::SnapshotStore;
pub use store::{StateSnapshot, StateStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
