use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, Params};
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::task::{normalize_description, Task, ValidationError};

const CREATE_TODOS: &str = "CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task TEXT NOT NULL,
    done BOOLEAN NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    completed_at DATETIME
)";
const TODO_COLUMNS: [&str; 5] = ["id", "task", "done", "created_at", "completed_at"];
const SELECT_TODOS: &str = "SELECT id, task, done, created_at, completed_at FROM todos";
const INSERT_TODO: &str =
    "INSERT INTO todos (task, done, created_at, completed_at) VALUES (?1, ?2, ?3, ?4)";
// MAX keeps completed_at >= created_at even if the clock steps backwards.
const COMPLETE_TODO: &str =
    "UPDATE todos SET done = 1, completed_at = MAX(?1, created_at) WHERE id = ?2 AND done = 0";
const DELETE_TODO: &str = "DELETE FROM todos WHERE id = ?1";

/// Fixed width so that text comparison in SQL matches time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Cannot open task database at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Unexpected task database schema: {0}")]
    Schema(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Corrupt value in todos.{column}: {detail}")]
    CorruptRow {
        column: &'static str,
        detail: String,
    },
}

/// A task carrying its own timestamps, e.g. one read from a snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub task: String,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// SQLite-backed storage for the `todos` table.
///
/// Every mutating call is a single statement (or a single transaction for
/// imports), so an interrupted process never leaves a half-applied change.
pub struct TaskStore {
    conn: Connection,
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl TaskStore {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(path: &Path, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| StoreError::Unavailable {
                path: path.to_path_buf(),
                source: Box::new(err),
            })?;
        }
        let conn = Connection::open(path).map_err(|err| StoreError::Unavailable {
            path: path.to_path_buf(),
            source: Box::new(err),
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let store = Self {
            conn,
            path: path.to_path_buf(),
            clock,
        };
        store.init_schema()?;
        info!(path = %path.display(), "task database opened");
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::in_memory_with_clock(Arc::new(SystemClock))
    }

    pub fn in_memory_with_clock(clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            path: PathBuf::from(":memory:"),
            clock,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Idempotent: creates `todos` when missing and checks the columns of an
    /// existing table.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(CREATE_TODOS).map_err(schema_error)?;

        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info('todos')")
            .map_err(schema_error)?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let missing: Vec<&str> = TODO_COLUMNS
            .iter()
            .copied()
            .filter(|name| !columns.iter().any(|col| col.eq_ignore_ascii_case(name)))
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::Schema(format!(
                "todos table is missing columns: {}",
                missing.join(", ")
            )));
        }
        debug!(path = %self.path.display(), "schema ready");
        Ok(())
    }

    /// Insert a pending task and return its id.
    pub fn add_task(&self, description: &str) -> Result<i64, StoreError> {
        let description = normalize_description(description)?;
        let now = self.clock.now();
        self.conn.execute(
            INSERT_TODO,
            params![description, false, encode_timestamp(now), Option::<String>::None],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, "task added");
        Ok(id)
    }

    /// Mark a task done. Unknown ids and already completed tasks are left
    /// untouched; the first completion time wins.
    pub fn complete_task(&self, id: i64) -> Result<(), StoreError> {
        let now = self.clock.now();
        let changed = self
            .conn
            .execute(COMPLETE_TODO, params![encode_timestamp(now), id])?;
        if changed == 0 {
            debug!(id, "complete skipped: no pending task with this id");
        } else {
            debug!(id, "task completed");
        }
        Ok(())
    }

    /// Remove a task. Unknown ids are not an error.
    pub fn delete_task(&self, id: i64) -> Result<(), StoreError> {
        let changed = self.conn.execute(DELETE_TODO, params![id])?;
        if changed == 0 {
            debug!(id, "delete skipped: no task with this id");
        } else {
            debug!(id, "task deleted");
        }
        Ok(())
    }

    pub fn get_all(&self) -> Result<Vec<Task>, StoreError> {
        self.select(&format!("{SELECT_TODOS} ORDER BY id"), [])
    }

    pub fn get_pending(&self) -> Result<Vec<Task>, StoreError> {
        self.select(&format!("{SELECT_TODOS} WHERE done = 0 ORDER BY id"), [])
    }

    /// Done tasks with `completed_at > threshold`.
    pub fn get_completed_since(&self, threshold: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        self.select(
            &format!("{SELECT_TODOS} WHERE done = 1 AND completed_at > ?1 ORDER BY id"),
            params![encode_timestamp(threshold)],
        )
    }

    /// Done tasks with `start < completed_at < end`.
    pub fn get_completed_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>, StoreError> {
        self.select(
            &format!(
                "{SELECT_TODOS} WHERE done = 1 \
                 AND completed_at > ?1 AND completed_at < ?2 ORDER BY id"
            ),
            params![encode_timestamp(start), encode_timestamp(end)],
        )
    }

    /// Insert tasks that already carry their timestamps. All rows go in or
    /// none do.
    pub fn import_records(&self, records: &[TaskRecord]) -> Result<Vec<i64>, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        {
            let mut stmt = tx.prepare(INSERT_TODO)?;
            for record in records {
                let description = normalize_description(&record.task)?;
                let completed_at = match (record.done, record.completed_at) {
                    (true, Some(at)) => Some(at.max(record.created_at)),
                    (true, None) => Some(record.created_at),
                    (false, _) => None,
                };
                stmt.execute(params![
                    description,
                    record.done,
                    encode_timestamp(record.created_at),
                    completed_at.map(encode_timestamp),
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        debug!(count = ids.len(), "tasks imported");
        Ok(ids)
    }

    fn select<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Task>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, task, done, created_at, completed_at)| {
                Ok(Task {
                    id,
                    task,
                    done,
                    created_at: decode_timestamp(&created_at, "created_at")?,
                    completed_at: completed_at
                        .map(|raw| decode_timestamp(&raw, "completed_at"))
                        .transpose()?,
                })
            })
            .collect()
    }
}

fn schema_error(err: rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::NotADatabase) => {
            StoreError::Schema("file is not a SQLite database".to_string())
        }
        _ => StoreError::Database(err),
    }
}

pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn decode_timestamp(raw: &str, column: &'static str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.fZ") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| StoreError::CorruptRow {
            column,
            detail: format!("{raw:?}: {err}"),
        })
}
