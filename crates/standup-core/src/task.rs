use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single to-do entry as persisted in the `todos` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub task: String,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_pending(&self) -> bool {
        !self.done
    }

    /// True when the task was completed strictly after `threshold`.
    pub fn completed_after(&self, threshold: DateTime<Utc>) -> bool {
        self.done
            && self
                .completed_at
                .map(|completed| completed > threshold)
                .unwrap_or(false)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Task description must not be empty")]
    EmptyDescription,
}

/// Trims a description and rejects it when nothing is left.
pub fn normalize_description(description: &str) -> Result<String, ValidationError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    Ok(trimmed.to_string())
}

pub fn count_pending(tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| task.is_pending()).count()
}
