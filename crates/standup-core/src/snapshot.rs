//! The older file-backed format: the whole task list serialised as one JSON
//! array and addressed by 1-based position.
//!
//! Kept for importing/exporting existing `.todos.json` files. Positions shift
//! after a delete, so the SQLite store is the source of truth.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::store::TaskRecord;
use crate::task::{normalize_description, Task, ValidationError};

#[derive(Debug, Error)]
pub enum TaskListError {
    #[error("Invalid Index")]
    InvalidIndex,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Snapshot IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    #[serde(rename = "Task")]
    pub task: String,
    #[serde(rename = "Done", default)]
    pub done: bool,
    #[serde(rename = "CreatedAt", default, with = "zero_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "CompletedAt", default, with = "zero_time")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SnapshotItem {
    /// Convert into a store record, filling gaps so that the task invariants
    /// hold: a done item always gets a completion time, never earlier than
    /// its creation time.
    pub fn to_record(&self, imported_at: DateTime<Utc>) -> TaskRecord {
        let created_at = self.created_at.unwrap_or(imported_at);
        let completed_at = if self.done {
            Some(self.completed_at.unwrap_or(created_at).max(created_at))
        } else {
            None
        };
        if completed_at != self.completed_at {
            warn!(task = %self.task, "normalised timestamps of legacy task");
        }
        TaskRecord {
            task: self.task.clone(),
            done: self.done,
            created_at,
            completed_at,
        }
    }
}

impl From<&Task> for SnapshotItem {
    fn from(task: &Task) -> Self {
        Self {
            task: task.task.clone(),
            done: task.done,
            created_at: Some(task.created_at),
            completed_at: task.completed_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskList {
    items: Vec<SnapshotItem>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            items: tasks.iter().map(SnapshotItem::from).collect(),
        }
    }

    pub fn items(&self) -> &[SnapshotItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add(&mut self, description: &str, now: DateTime<Utc>) -> Result<(), TaskListError> {
        let task = normalize_description(description)?;
        self.items.push(SnapshotItem {
            task,
            done: false,
            created_at: Some(now),
            completed_at: None,
        });
        Ok(())
    }

    /// Complete the item at 1-based `index`. A second completion keeps the
    /// original time.
    pub fn complete(&mut self, index: usize, now: DateTime<Utc>) -> Result<(), TaskListError> {
        let item = self.item_mut(index)?;
        if !item.done {
            item.done = true;
            item.completed_at = Some(now);
        }
        Ok(())
    }

    /// Remove the item at 1-based `index`; later items shift down by one.
    pub fn delete(&mut self, index: usize) -> Result<SnapshotItem, TaskListError> {
        self.check_index(index)?;
        Ok(self.items.remove(index - 1))
    }

    pub fn count_pending(&self) -> usize {
        self.items.iter().filter(|item| !item.done).count()
    }

    /// A missing or empty file is an empty list.
    pub fn load(path: &Path) -> Result<Self, TaskListError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(err) => return Err(err.into()),
        };
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write via a sibling temp file and rename, so a crash never leaves a
    /// truncated snapshot behind.
    pub fn save(&self, path: &Path) -> Result<(), TaskListError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn to_records(&self, imported_at: DateTime<Utc>) -> Vec<TaskRecord> {
        self.items
            .iter()
            .map(|item| item.to_record(imported_at))
            .collect()
    }

    /// View the list as tasks whose ids are their 1-based positions.
    pub fn to_tasks(&self, imported_at: DateTime<Utc>) -> Vec<Task> {
        self.to_records(imported_at)
            .into_iter()
            .enumerate()
            .map(|(idx, record)| Task {
                id: idx as i64 + 1,
                task: record.task,
                done: record.done,
                created_at: record.created_at,
                completed_at: record.completed_at,
            })
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<(), TaskListError> {
        if index == 0 || index > self.items.len() {
            return Err(TaskListError::InvalidIndex);
        }
        Ok(())
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut SnapshotItem, TaskListError> {
        self.check_index(index)?;
        Ok(&mut self.items[index - 1])
    }
}

/// Timestamps where the zero time `0001-01-01T00:00:00Z` (or null) means
/// "not set".
mod zero_time {
    use chrono::{DateTime, Datelike, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_str(ZERO_TIME),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let parsed = DateTime::parse_from_rfc3339(raw.trim())
            .map_err(serde::de::Error::custom)?
            .with_timezone(&Utc);
        if parsed.year() <= 1 {
            return Ok(None);
        }
        Ok(Some(parsed))
    }
}
