//! Slate: a hierarchical task tracker with conflict-checked scheduling.
//!
//! Three kinds of work items live in one graph: plain tasks, epics, and the
//! subtasks an epic owns. The store keeps every epic's status and time window
//! derived from its subtasks, refuses schedules that overlap another
//! scheduled item, and remembers which entities were viewed most recently.
//!
//! # Example
//!
//! ```
//! use slate::{Epic, Status, Subtask, Task, TaskStore};
//!
//! let mut store = TaskStore::new();
//!
//! // A standalone task planned for an hour
//! let start = "2025-02-18T13:15:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap();
//! let task = store
//!     .create_task(Task::new("Write report", None, Status::New, Some(start), Some(60)))
//!     .unwrap();
//!
//! // An epic derives its state from its subtasks
//! let epic = store.create_epic(Epic::new("Release", None)).unwrap();
//! store
//!     .create_subtask(Subtask::new("Tag build", None, Status::Done, epic.id, None, None))
//!     .unwrap();
//! assert_eq!(store.get_epic(epic.id).unwrap().status, Status::Done);
//!
//! // Scheduled items come back ordered by start time
//! assert_eq!(store.prioritized()[0].id(), task.id);
//! ```

mod history;
mod schedule;
mod store;
mod types;

pub mod client;
pub mod config;
pub mod daemon;
pub mod protocol;
pub mod storage;

// Re-export public API
pub use client::Client;
pub use config::Config;
pub use daemon::{Daemon, DaemonConfig, is_daemon_running, start_daemon};
pub use protocol::{Request, Response};
pub use storage::FileStore;
pub use store::{StoreError, TaskStore};
pub use types::{Entity, Epic, Kind, Slot, Status, Subtask, Task, TaskId};
