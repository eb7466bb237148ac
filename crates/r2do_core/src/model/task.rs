//! Task entity.
//!
//! # Responsibility
//! - Hold one unit of work with its completion state and timestamps.
//! - Render the single-line and detailed task views.
//!
//! # Invariants
//! - `description` is non-empty and at most `MAX_DESCRIPTION_CHARS` characters.
//! - `created_at` is set once at construction.
//! - `completed_at` is `Some` exactly when `done` is true.

use super::validation::ValidationError;
use super::{format_date, now_timestamp, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable task identifier.
pub type TaskId = Uuid;

/// Maximum task description length, counted in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub uuid: TaskId,
    pub description: String,
    pub done: bool,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Task {
    /// Creates a pending task stamped with the current time.
    ///
    /// Store-wide description uniqueness is checked by `State`, not here.
    pub fn new(description: impl Into<String>) -> Result<Self, ValidationError> {
        let task = Self::with_id(Uuid::new_v4(), description, now_timestamp());
        task.validate()?;
        Ok(task)
    }

    /// Rebuilds a pending task from persisted identity without validating.
    pub fn with_id(uuid: TaskId, description: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            uuid,
            description: description.into(),
            done: false,
            created_at,
            completed_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_description(&self.description)?;
        Ok(())
    }

    /// Marks the task done. Repeated calls refresh `completed_at`.
    pub fn complete(&mut self) {
        self.complete_at(now_timestamp());
    }

    pub fn complete_at(&mut self, at: Timestamp) {
        self.done = true;
        self.completed_at = Some(at);
    }

    /// One-line listing view: marker, padded description, creation date.
    pub fn render(&self) -> String {
        let marker = if self.done { 'x' } else { ' ' };
        let description: String = self.description.chars().take(MAX_DESCRIPTION_CHARS).collect();
        format!(
            "[{marker}] {description:<width$} {}",
            format_date(&self.created_at),
            width = MAX_DESCRIPTION_CHARS
        )
    }

    /// Multi-line "selected task" view including completion date when done.
    pub fn details(&self) -> String {
        let mut result = format!(
            "Selected task:\n   {}\n\nCreated:\n   {}",
            self.description,
            format_date(&self.created_at)
        );
        if let Some(completed_at) = self.completed_at.as_ref().filter(|_| self.done) {
            result.push_str(&format!("\nCompleted:\n   {}", format_date(completed_at)));
        }
        result
    }
}

/// Checks description presence and length.
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.trim().is_empty() {
        return Err(ValidationError::EmptyTaskDescription);
    }
    let actual = description.chars().count();
    if actual > MAX_DESCRIPTION_CHARS {
        return Err(ValidationError::TaskDescriptionTooLong {
            max: MAX_DESCRIPTION_CHARS,
            actual,
        });
    }
    Ok(())
}
