//! IPC protocol types for daemon communication.

use crate::types::{Entity, Epic, Subtask, Task, TaskId};
use serde::{Deserialize, Serialize};

/// Request sent from client to daemon. Covers the store's full surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    CreateTask { task: Task },
    UpdateTask { task: Task },
    GetTask { id: TaskId },
    ListTasks,
    DeleteTask { id: TaskId },
    DeleteAllTasks,

    CreateEpic { epic: Epic },
    UpdateEpic { epic: Epic },
    GetEpic { id: TaskId },
    ListEpics,
    DeleteEpic { id: TaskId },
    DeleteAllEpics,

    /// Subtasks of one epic, in the epic's order.
    EpicSubtasks { id: TaskId },

    CreateSubtask { subtask: Subtask },
    UpdateSubtask { subtask: Subtask },
    GetSubtask { id: TaskId },
    ListSubtasks,
    DeleteSubtask { id: TaskId },
    DeleteAllSubtasks,

    /// Recently viewed entities, oldest first.
    History,

    /// Scheduled items ordered by start time.
    Prioritized,

    /// Ping to check if daemon is alive.
    Ping,

    /// Shutdown the daemon.
    Shutdown,
}

/// Response sent from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Task { task: Task },
    Tasks { tasks: Vec<Task> },

    Epic { epic: Epic },
    Epics { epics: Vec<Epic> },

    Subtask { subtask: Subtask },
    Subtasks { subtasks: Vec<Subtask> },

    /// Mixed-kind result (history, prioritized).
    Entities { entities: Vec<Entity> },

    /// No live entity under the id. An HTTP front end maps this to 404.
    NotFound { id: TaskId },

    /// The store rejected the mutation (scheduling conflict, missing or
    /// mismatched parent). An HTTP front end maps this to the 406 class.
    Rejected { message: String },

    /// Operation succeeded with nothing to return.
    Ok,

    /// Pong response to ping.
    Pong,

    /// Transport or internal error.
    Error { message: String },
}

impl Response {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Create a rejection response.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}
