//! Whole-document snapshot backend.
//!
//! # Responsibility
//! - Serialize the entire category/task graph to one JSON file.
//! - Load the whole document back, or an empty graph when no file exists.
//!
//! # Invariants
//! - The file is only rewritten when a change was recorded since the last
//!   load or save.
//! - The document is written to a sibling temp file and renamed into place,
//!   so a failed write never truncates the previous snapshot.

use super::{StateSnapshot, StateStore, StoreResult};
use crate::model::category::{Category, CategoryId};
use crate::model::task::{Task, TaskId};
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-backed store that reads and writes the graph wholesale.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    dirty: bool,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns whether a change is waiting for `save`.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl StateStore for SnapshotStore {
    fn load(&mut self) -> StoreResult<StateSnapshot> {
        let snapshot = match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => StateSnapshot::default(),
            Err(err) => return Err(err.into()),
        };
        self.dirty = false;
        info!(
            "event=store_load module=store backend=snapshot status=ok categories={}",
            snapshot.categories.len()
        );
        Ok(snapshot)
    }

    fn save(&mut self, snapshot: &StateSnapshot) -> StoreResult<()> {
        if !self.dirty {
            debug!("event=store_save module=store backend=snapshot status=skipped reason=clean");
            return Ok(());
        }

        let encoded = serde_json::to_vec_pretty(snapshot)?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, encoded)?;
        fs::rename(&staging, &self.path)?;
        self.dirty = false;

        info!(
            "event=store_save module=store backend=snapshot status=ok categories={}",
            snapshot.categories.len()
        );
        Ok(())
    }

    fn create_category(&mut self, _category: &Category, _make_current: bool) -> StoreResult<()> {
        self.mark_dirty();
        Ok(())
    }

    fn update_category(&mut self, _category: &Category) -> StoreResult<()> {
        self.mark_dirty();
        Ok(())
    }

    fn destroy_category(&mut self, _id: CategoryId) -> StoreResult<()> {
        self.mark_dirty();
        Ok(())
    }

    fn set_current_category(&mut self, _id: Option<CategoryId>) -> StoreResult<()> {
        self.mark_dirty();
        Ok(())
    }

    fn create_task(
        &mut self,
        _category: CategoryId,
        _task: &Task,
        _make_current: bool,
    ) -> StoreResult<()> {
        self.mark_dirty();
        Ok(())
    }

    fn update_task(&mut self, _task: &Task) -> StoreResult<()> {
        self.mark_dirty();
        Ok(())
    }

    fn destroy_task(&mut self, _id: TaskId) -> StoreResult<()> {
        self.mark_dirty();
        Ok(())
    }

    fn set_current_task(&mut self, _id: Option<TaskId>) -> StoreResult<()> {
        self.mark_dirty();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SnapshotStore;
    use crate::model::category::Category;
    use crate::store::{StateSnapshot, StateStore, StoreError};

    #[test]
    fn load_missing_file_yields_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnapshotStore::new(dir.path().join("missing.json"));

        assert_eq!(store.load().unwrap(), StateSnapshot::default());
        assert!(!store.is_dirty());
    }

    #[test]
    fn save_without_changes_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = SnapshotStore::new(&path);

        store.load().unwrap();
        store.save(&StateSnapshot::default()).unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn save_after_change_writes_document_and_clears_dirty_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = SnapshotStore::new(&path);
        let category = Category::new("work").unwrap();

        store.create_category(&category, true).unwrap();
        assert!(store.is_dirty());

        let snapshot = StateSnapshot {
            current_category: Some(category.uuid),
            categories: vec![category],
        };
        store.save(&snapshot).unwrap();

        assert!(!store.is_dirty());
        assert!(!dir.path().join("state.tmp").exists());
        let mut reopened = SnapshotStore::new(&path);
        assert_eq!(reopened.load().unwrap(), snapshot);
    }

    #[test]
    fn load_rejects_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = SnapshotStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
