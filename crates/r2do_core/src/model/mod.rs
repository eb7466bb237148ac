//! Category/task domain model.
//!
//! # Responsibility
//! - Define the entities persisted by every `StateStore` backend.
//! - Own field-level validation shared by in-memory and store write paths.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID that survives renames.
//! - Timestamps are UTC with millisecond precision so all backends
//!   round-trip identical values.
//! - "Current" selection is not stored on entities; it is owned by `State`.

pub mod category;
pub mod task;
pub mod validation;

use chrono::{DateTime, SubsecRound, Utc};

/// Point in time attached to task lifecycle events.
pub type Timestamp = DateTime<Utc>;

/// Returns the current time truncated to millisecond precision.
pub fn now_timestamp() -> Timestamp {
    Utc::now().trunc_subsecs(3)
}

/// Display format used for task dates, e.g. `Mon Oct  5, 2026`.
pub(crate) fn format_date(value: &Timestamp) -> String {
    value.format("%a %b %e, %Y").to_string()
}
