//! In-memory state facade over a `StateStore`.
//!
//! # Responsibility
//! - Load the category/task graph and serve all reads from memory.
//! - Validate every mutation, forward it to the store, then apply it.
//! - Own the current-category and current-task selections.
//!
//! # Invariants
//! - At most one category is current; at most one task is current and it
//!   belongs to the current category.
//! - Category names and task descriptions are unique across the store.
//! - A failed operation leaves memory and store unchanged: memory is only
//!   touched after the store call succeeded.

use crate::model::category::{validate_name, Category, CategoryError, CategoryId};
use crate::model::task::{Task, TaskId};
use crate::model::validation::ValidationError;
use crate::store::{StateSnapshot, StateStore, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StateResult<T> = Result<T, StateError>;

/// Error surfaced to callers of `State`.
#[derive(Debug)]
pub enum StateError {
    /// Empty/oversized field or uniqueness violation.
    Validation(ValidationError),
    /// No category with this name exists.
    CategoryNotFound(String),
    /// No task with this description exists where it was looked up.
    TaskNotFound(String),
    /// Rename target is taken by another category.
    CategoryAlreadyExists(String),
    /// A required argument was absent or unusable.
    InvalidArgument(&'static str),
    /// Persistence failure; fatal for the running invocation.
    Store(StoreError),
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::CategoryNotFound(name) => write!(f, "category '{name}' not found"),
            Self::TaskNotFound(description) => write!(f, "task '{description}' not found"),
            Self::CategoryAlreadyExists(name) => write!(f, "category '{name}' already exists"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StateError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for StateError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(err) => Self::Validation(err),
            StoreError::ConstraintViolation(message) => {
                Self::Validation(ValidationError::Constraint(message))
            }
            other => Self::Store(other),
        }
    }
}

/// Attributes for a category created through `State::add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
}

impl From<&str> for NewCategory {
    fn from(value: &str) -> Self {
        Self {
            name: value.to_string(),
        }
    }
}

impl From<String> for NewCategory {
    fn from(value: String) -> Self {
        Self { name: value }
    }
}

/// Returns `value` or `InvalidArgument` naming the missing argument.
pub fn required_arg<'a>(value: Option<&'a str>, what: &'static str) -> StateResult<&'a str> {
    value.ok_or(StateError::InvalidArgument(what))
}

/// Category/task graph plus current selections, backed by `S`.
pub struct State<S: StateStore> {
    store: S,
    categories: Vec<Category>,
    current: Option<CategoryId>,
}

impl<S: StateStore> State<S> {
    /// Takes ownership of an open store and loads its contents.
    pub fn open(store: S) -> StateResult<Self> {
        let mut state = Self {
            store,
            categories: Vec::new(),
            current: None,
        };
        state.init()?;
        Ok(state)
    }

    /// (Re)loads every category and task from the store.
    pub fn init(&mut self) -> StateResult<()> {
        let StateSnapshot {
            mut categories,
            current_category,
        } = self.store.load()?;

        let current = current_category.filter(|id| categories.iter().any(|c| c.uuid == *id));
        if current != current_category {
            warn!("event=state_init module=state status=repaired reason=dangling_current_category");
        }
        for category in categories
            .iter_mut()
            .filter(|category| Some(category.uuid) != current)
        {
            if category.current_task.take().is_some() {
                warn!("event=state_init module=state status=repaired reason=current_task_outside_current_category");
            }
        }

        self.categories = categories;
        self.current = current;
        info!(
            "event=state_init module=state status=ok categories={} has_current={}",
            self.categories.len(),
            self.current.is_some()
        );
        Ok(())
    }

    /// Flushes pending changes, then reloads from the store.
    pub fn reset(&mut self) -> StateResult<()> {
        self.save()?;
        self.init()
    }

    /// All categories in insertion order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn current_category(&self) -> Option<&Category> {
        let id = self.current?;
        self.categories.iter().find(|category| category.uuid == id)
    }

    pub fn is_current(&self, category: &Category) -> bool {
        self.current == Some(category.uuid)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.name == name)
    }

    /// Makes the named category current, clearing the previous one.
    pub fn set_current(&mut self, name: &str) -> StateResult<()> {
        let id = self.require_category(name)?.uuid;
        self.store.set_current_category(Some(id))?;
        self.apply_current(Some(id));
        Ok(())
    }

    /// Leaves no category current. No-op when none is.
    pub fn clear_current_category(&mut self) -> StateResult<()> {
        if self.current.is_none() {
            return Ok(());
        }
        self.store.set_current_category(None)?;
        self.apply_current(None);
        Ok(())
    }

    /// Creates a category and makes it current.
    pub fn add(&mut self, attributes: impl Into<NewCategory>) -> StateResult<&Category> {
        let NewCategory { name } = attributes.into();
        let category = Category::new(name)?;
        if self.contains(&category.name) {
            return Err(ValidationError::DuplicateCategoryName(category.name).into());
        }

        self.store.create_category(&category, true)?;
        let id = category.uuid;
        self.categories.push(category);
        self.apply_current(Some(id));
        info!("event=category_add module=state status=ok category_id={}", id);

        let index = self.categories.len() - 1;
        Ok(&self.categories[index])
    }

    /// Selects the named category, creating it first if needed.
    ///
    /// Returns `true` when the category was created.
    pub fn select_or_create(&mut self, name: &str) -> StateResult<bool> {
        if self.contains(name) {
            self.set_current(name)?;
            Ok(false)
        } else {
            self.add(name)?;
            Ok(true)
        }
    }

    /// Renames a category in place, keeping its id, tasks and selection.
    pub fn rename(&mut self, original_name: &str, new_name: &str) -> StateResult<()> {
        let index = self.category_index(original_name)?;
        if original_name == new_name {
            return Ok(());
        }
        if self.contains(new_name) {
            return Err(StateError::CategoryAlreadyExists(new_name.to_string()));
        }
        validate_name(new_name)?;

        let mut renamed = Category::with_id(self.categories[index].uuid, new_name);
        renamed.current_task = self.categories[index].current_task;
        self.store.update_category(&renamed)?;
        self.categories[index].name = renamed.name;
        Ok(())
    }

    /// Destroys a category and its tasks, dropping the selection if it was
    /// current.
    pub fn remove(&mut self, name: &str) -> StateResult<()> {
        let index = self.category_index(name)?;
        let id = self.categories[index].uuid;

        self.store.destroy_category(id)?;
        self.categories.remove(index);
        if self.current == Some(id) {
            self.current = None;
        }
        info!("event=category_remove module=state status=ok category_id={}", id);
        Ok(())
    }

    /// Appends a task to the named category.
    ///
    /// The new task becomes the current task when its category is current.
    pub fn add_task(&mut self, category_name: &str, description: &str) -> StateResult<TaskId> {
        let index = self.category_index(category_name)?;
        let task = Task::new(description)?;
        if self.find_task(&task.description).is_some() {
            return Err(ValidationError::DuplicateTaskDescription(task.description).into());
        }

        let category_id = self.categories[index].uuid;
        let make_current = self.current == Some(category_id);
        let task_id = task.uuid;
        self.store.create_task(category_id, &task, make_current)?;

        self.categories[index]
            .add(task)
            .map_err(|err| category_error(err, description))?;
        if make_current {
            self.select_task(index, Some(task_id));
        }
        info!(
            "event=task_add module=state status=ok category_id={} task_id={}",
            category_id, task_id
        );
        Ok(task_id)
    }

    /// Deletes a task from the named category.
    pub fn remove_task(&mut self, category_name: &str, description: &str) -> StateResult<()> {
        let index = self.category_index(category_name)?;
        let id = self.categories[index]
            .find_by_description(description)
            .map(|task| task.uuid)
            .ok_or_else(|| StateError::TaskNotFound(description.to_string()))?;

        self.store.destroy_task(id)?;
        self.categories[index]
            .remove(id)
            .map_err(|err| category_error(err, description))?;
        Ok(())
    }

    /// Marks a task done, refreshing its completion time if already done.
    pub fn complete_task(&mut self, description: &str) -> StateResult<&Task> {
        let (index, mut task) = self
            .locate_task(description)
            .map(|(index, task)| (index, task.clone()))
            .ok_or_else(|| StateError::TaskNotFound(description.to_string()))?;
        task.complete();

        self.store.update_task(&task)?;
        let slot = self.categories[index]
            .find_by_description_mut(description)
            .ok_or_else(|| StateError::TaskNotFound(description.to_string()))?;
        *slot = task;
        Ok(&*slot)
    }

    /// Makes a task current, clearing the previous current task and
    /// selecting the task's category.
    pub fn mark_current_task(&mut self, description: &str) -> StateResult<()> {
        let (index, id) = self
            .locate_task(description)
            .map(|(index, task)| (index, task.uuid))
            .ok_or_else(|| StateError::TaskNotFound(description.to_string()))?;

        let category_id = self.categories[index].uuid;
        self.store.set_current_task(Some(id))?;
        self.apply_current(Some(category_id));
        self.select_task(index, Some(id));
        Ok(())
    }

    /// Leaves no task current. No-op when none is.
    pub fn clear_current_task(&mut self) -> StateResult<()> {
        if self.current_task().is_none() {
            return Ok(());
        }
        self.store.set_current_task(None)?;
        for category in &mut self.categories {
            category.current_task = None;
        }
        Ok(())
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.current_category()?.current_task()
    }

    /// Finds a task anywhere in the store by its description.
    pub fn find_task(&self, description: &str) -> Option<(&Category, &Task)> {
        self.categories.iter().find_map(|category| {
            category
                .find_by_description(description)
                .map(|task| (category, task))
        })
    }

    /// Completed tasks across all categories, in display order.
    pub fn completed_tasks(&self) -> Vec<&Task> {
        self.categories
            .iter()
            .flat_map(|category| category.tasks.iter())
            .filter(|task| task.done)
            .collect()
    }

    /// Clones the graph in the shape stores persist.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            categories: self.categories.clone(),
            current_category: self.current,
        }
    }

    /// Flushes pending changes without giving up the store.
    pub fn save(&mut self) -> StateResult<()> {
        let snapshot = self.snapshot();
        self.store.save(&snapshot)?;
        Ok(())
    }

    /// Flushes pending changes and hands the store back for closing.
    pub fn close(self) -> StateResult<S> {
        let Self {
            mut store,
            categories,
            current,
        } = self;
        store.save(&StateSnapshot {
            categories,
            current_category: current,
        })?;
        Ok(store)
    }

    /// Borrows the underlying store for store-level queries.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn category_index(&self, name: &str) -> StateResult<usize> {
        self.categories
            .iter()
            .position(|category| category.name == name)
            .ok_or_else(|| StateError::CategoryNotFound(name.to_string()))
    }

    fn require_category(&self, name: &str) -> StateResult<&Category> {
        self.get(name)
            .ok_or_else(|| StateError::CategoryNotFound(name.to_string()))
    }

    fn locate_task(&self, description: &str) -> Option<(usize, &Task)> {
        self.categories
            .iter()
            .enumerate()
            .find_map(|(index, category)| {
                category
                    .find_by_description(description)
                    .map(|task| (index, task))
            })
    }

    /// Mirrors `StateStore::set_current_category`: tasks outside the new
    /// current category lose their current flag.
    fn apply_current(&mut self, id: Option<CategoryId>) {
        self.current = id;
        for category in &mut self.categories {
            if Some(category.uuid) != id {
                category.current_task = None;
            }
        }
    }

    /// Mirrors `StateStore::set_current_task` for an owned task.
    fn select_task(&mut self, index: usize, id: Option<TaskId>) {
        for (position, category) in self.categories.iter_mut().enumerate() {
            if position != index {
                category.current_task = None;
            }
        }
        if self.categories[index].set_current_task(id).is_err() {
            self.categories[index].current_task = None;
        }
    }
}

fn category_error(err: CategoryError, description: &str) -> StateError {
    match err {
        CategoryError::InvalidArgument(message) => StateError::InvalidArgument(message),
        CategoryError::TaskNotFound(_) => StateError::TaskNotFound(description.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{required_arg, StateError};
    use crate::model::validation::ValidationError;
    use crate::store::StoreError;

    #[test]
    fn required_arg_reports_missing_argument() {
        assert_eq!(required_arg(Some("work"), "NAME").unwrap(), "work");
        assert!(matches!(
            required_arg(None, "NAME"),
            Err(StateError::InvalidArgument("NAME"))
        ));
    }

    #[test]
    fn store_constraint_violation_surfaces_as_validation() {
        let err = StateError::from(StoreError::ConstraintViolation(
            "UNIQUE constraint failed: categories.name".to_string(),
        ));
        assert!(matches!(
            err,
            StateError::Validation(ValidationError::Constraint(_))
        ));

        let err = StateError::from(StoreError::InvalidData("bad row".to_string()));
        assert!(matches!(err, StateError::Store(_)));
    }
}
