//! Field validation errors for categories and tasks.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure raised before any state change is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Category name is blank after trim.
    EmptyCategoryName,
    /// Another category already uses this name.
    DuplicateCategoryName(String),
    /// Task description is empty.
    EmptyTaskDescription,
    /// Task description exceeds the character limit.
    TaskDescriptionTooLong { max: usize, actual: usize },
    /// Another task in the store already uses this description.
    DuplicateTaskDescription(String),
    /// The backing store rejected a write on a declared constraint.
    Constraint(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCategoryName => write!(f, "category name must not be blank"),
            Self::DuplicateCategoryName(name) => {
                write!(f, "a category named '{name}' already exists")
            }
            Self::EmptyTaskDescription => write!(f, "task description must not be empty"),
            Self::TaskDescriptionTooLong { max, actual } => write!(
                f,
                "task description must be at most {max} characters, got {actual}"
            ),
            Self::DuplicateTaskDescription(description) => {
                write!(f, "a task described as '{description}' already exists")
            }
            Self::Constraint(message) => write!(f, "constraint violation: {message}"),
        }
    }
}

impl Error for ValidationError {}
