use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use tracing::info;

use crate::snapshot::{TaskList, TaskListError};
use crate::standup::{today_tasks, StandupWindow};
use crate::store::{StoreError, TaskStore};
use crate::task::{count_pending, Task};

#[derive(Debug, Error)]
pub enum SnapshotTransferError {
    #[error(transparent)]
    Snapshot(#[from] TaskListError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Domain-facing operations over a [`TaskStore`]. Store errors are passed
/// through unchanged; callers decide whether to fail or degrade.
pub struct TaskRepository {
    store: TaskStore,
}

impl TaskRepository {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        TaskStore::open(path).map(Self::new)
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn add(&self, description: &str) -> Result<i64, StoreError> {
        self.store.add_task(description)
    }

    pub fn complete(&self, id: i64) -> Result<(), StoreError> {
        self.store.complete_task(id)
    }

    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.store.delete_task(id)
    }

    pub fn list_all(&self) -> Result<Vec<Task>, StoreError> {
        self.store.get_all()
    }

    pub fn pending(&self) -> Result<Vec<Task>, StoreError> {
        self.store.get_pending()
    }

    pub fn completed_since(&self, threshold: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        self.store.get_completed_since(threshold)
    }

    pub fn count_pending(&self) -> Result<usize, StoreError> {
        Ok(count_pending(&self.store.get_pending()?))
    }

    /// Tasks completed during the lookback day, and the lookback date.
    pub fn standup_report<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<(Vec<String>, DateTime<Tz>), StoreError> {
        let window = StandupWindow::for_time(now);
        let tasks = self.store.get_completed_between(window.start, window.end)?;
        let descriptions = tasks.into_iter().map(|task| task.task).collect();
        Ok((descriptions, window.lookback))
    }

    /// All pending tasks; `now` is echoed back as the report label.
    pub fn today_report<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<(Vec<String>, DateTime<Tz>), StoreError> {
        let pending = self.store.get_pending()?;
        Ok(today_tasks(&pending, now))
    }

    /// Copy every task of a JSON snapshot into the store in one transaction.
    pub fn import_snapshot(
        &self,
        path: &Path,
        imported_at: DateTime<Utc>,
    ) -> Result<Vec<i64>, SnapshotTransferError> {
        let list = TaskList::load(path)?;
        let ids = self.store.import_records(&list.to_records(imported_at))?;
        info!(path = %path.display(), count = ids.len(), "snapshot imported");
        Ok(ids)
    }

    /// Write every stored task to a JSON snapshot.
    pub fn export_snapshot(&self, path: &Path) -> Result<usize, SnapshotTransferError> {
        let tasks = self.store.get_all()?;
        TaskList::from_tasks(&tasks).save(path)?;
        info!(path = %path.display(), count = tasks.len(), "snapshot exported");
        Ok(tasks.len())
    }
}
