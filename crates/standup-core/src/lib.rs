//! Task persistence and standup/today queries for the `standup` CLI.

pub mod clock;
pub mod config;
pub mod repository;
pub mod snapshot;
pub mod standup;
pub mod store;
pub mod task;

pub use repository::TaskRepository;
pub use store::{StoreError, TaskStore};
pub use task::Task;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
