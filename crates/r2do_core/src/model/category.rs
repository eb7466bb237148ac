//! Category entity.
//!
//! # Responsibility
//! - Own an ordered list of tasks and a local "current task" slot.
//! - Render the category listing view.
//!
//! # Invariants
//! - `name` is non-blank; uniqueness across categories is checked by `State`.
//! - Task insertion order is preserved.
//! - `current_task`, when set, refers to a task owned by this category.
//!   System-wide uniqueness of the current task is enforced by `State`.

use super::task::{Task, TaskId, MAX_DESCRIPTION_CHARS};
use super::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable category identifier.
pub type CategoryId = Uuid;

const RULE_WIDTH: usize = 51;

/// Errors from category-local task bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryError {
    /// A required argument was missing or unusable.
    InvalidArgument(&'static str),
    /// The referenced task is not owned by this category.
    TaskNotFound(TaskId),
}

impl Display for CategoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::TaskNotFound(id) => write!(f, "task not found in category: {id}"),
        }
    }
}

impl Error for CategoryError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub uuid: CategoryId,
    pub name: String,
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub current_task: Option<TaskId>,
}

impl Category {
    /// Creates an empty category with a generated id.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let category = Self::with_id(Uuid::new_v4(), name);
        category.validate()?;
        Ok(category)
    }

    /// Rebuilds an empty category from persisted identity without validating.
    pub fn with_id(uuid: CategoryId, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            tasks: Vec::new(),
            current_task: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)
    }

    pub fn find_by_description(&self, description: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.description == description)
    }

    pub(crate) fn find_by_description_mut(&mut self, description: &str) -> Option<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|task| task.description == description)
    }

    pub fn owns(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|task| task.uuid == id)
    }

    /// Appends a task, rejecting one this category already holds.
    pub fn add(&mut self, task: Task) -> Result<(), CategoryError> {
        if self.owns(task.uuid) || self.find_by_description(&task.description).is_some() {
            return Err(CategoryError::InvalidArgument(
                "task is already part of this category",
            ));
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Removes and returns an owned task, dropping it from the current slot.
    pub fn remove(&mut self, id: TaskId) -> Result<Task, CategoryError> {
        let index = self
            .tasks
            .iter()
            .position(|task| task.uuid == id)
            .ok_or(CategoryError::TaskNotFound(id))?;
        if self.current_task == Some(id) {
            self.current_task = None;
        }
        Ok(self.tasks.remove(index))
    }

    /// Local bookkeeping only; callers enforce the system-wide single
    /// current task.
    pub fn set_current_task(&mut self, id: Option<TaskId>) -> Result<(), CategoryError> {
        if let Some(id) = id {
            if !self.owns(id) {
                return Err(CategoryError::TaskNotFound(id));
            }
        }
        self.current_task = id;
        Ok(())
    }

    pub fn current_task(&self) -> Option<&Task> {
        let id = self.current_task?;
        self.tasks.iter().find(|task| task.uuid == id)
    }

    /// Listing view: header, column row, rule, then one line per task.
    pub fn render(&self) -> String {
        let mut result = format!("{}:\n\n", self.name);
        result.push_str(&format!(
            "    {:<width$}     {}\n",
            "Task",
            "Completed",
            width = MAX_DESCRIPTION_CHARS
        ));
        result.push_str("    ");
        result.push_str(&"-".repeat(RULE_WIDTH));
        result.push('\n');
        for task in &self.tasks {
            result.push_str("    ");
            result.push_str(&task.render());
            result.push('\n');
        }
        result
    }
}

/// Checks that a category name is not blank.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyCategoryName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Category, CategoryError};
    use crate::model::task::Task;
    use crate::model::validation::ValidationError;

    #[test]
    fn new_rejects_blank_name() {
        assert_eq!(
            Category::new("   ").unwrap_err(),
            ValidationError::EmptyCategoryName
        );
    }

    #[test]
    fn add_keeps_insertion_order_and_find_by_description() {
        let mut category = Category::new("work").unwrap();
        category.add(Task::new("first").unwrap()).unwrap();
        category.add(Task::new("second").unwrap()).unwrap();

        let descriptions: Vec<&str> = category
            .tasks
            .iter()
            .map(|task| task.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["first", "second"]);
        assert!(category.find_by_description("second").is_some());
        assert!(category.find_by_description("third").is_none());
    }

    #[test]
    fn add_rejects_task_already_owned() {
        let mut category = Category::new("work").unwrap();
        let task = Task::new("first").unwrap();
        category.add(task.clone()).unwrap();

        let err = category.add(task).unwrap_err();
        assert!(matches!(err, CategoryError::InvalidArgument(_)));
        assert_eq!(category.tasks.len(), 1);
    }

    #[test]
    fn remove_unknown_task_returns_not_found() {
        let mut category = Category::new("work").unwrap();
        let stray = Task::new("stray").unwrap();

        let err = category.remove(stray.uuid).unwrap_err();
        assert_eq!(err, CategoryError::TaskNotFound(stray.uuid));
    }

    #[test]
    fn remove_clears_current_slot_for_removed_task() {
        let mut category = Category::new("work").unwrap();
        let task = Task::new("first").unwrap();
        let id = task.uuid;
        category.add(task).unwrap();
        category.set_current_task(Some(id)).unwrap();

        let removed = category.remove(id).unwrap();
        assert_eq!(removed.uuid, id);
        assert!(category.current_task().is_none());
    }

    #[test]
    fn set_current_task_requires_ownership() {
        let mut category = Category::new("work").unwrap();
        let stray = Task::new("stray").unwrap();
        assert_eq!(
            category.set_current_task(Some(stray.uuid)).unwrap_err(),
            CategoryError::TaskNotFound(stray.uuid)
        );
    }

    #[test]
    fn render_lists_header_rule_and_tasks() {
        let mut category = Category::new("A category").unwrap();
        let task = Task::new("Sample task").unwrap();
        let task_line = task.render();
        category.add(task).unwrap();

        let mut expected = String::from("A category:\n\n");
        expected.push_str(&format!("    {:<30}     {}\n", "Task", "Completed"));
        expected.push_str(&format!("    {}\n", "-".repeat(51)));
        expected.push_str(&format!("    {task_line}\n"));
        assert_eq!(category.render(), expected);
    }
}
