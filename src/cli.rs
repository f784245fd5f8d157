//! CLI argument parsing for Slate.

use clap::{Parser, Subcommand, ValueEnum};
use slate::TaskId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "slate",
    about = "Hierarchical task tracker with conflict-checked scheduling",
    version,
    after_help = "Logs are written to: ~/.local/share/slate/logs/slate.log"
)]
pub struct Cli {
    /// Path to the tracker root directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a task
    Add {
        /// Task name
        name: String,

        /// Description
        #[arg(short = 'D', long)]
        description: Option<String>,

        /// Planned start (RFC 3339 or YYYY-MM-DDTHH:MM)
        #[arg(short, long)]
        start: Option<String>,

        /// Planned duration in minutes
        #[arg(short = 'm', long)]
        duration: Option<u32>,
    },

    /// Create an epic
    Epic {
        /// Epic name
        name: String,

        /// Description
        #[arg(short = 'D', long)]
        description: Option<String>,
    },

    /// Create a subtask under an epic
    Sub {
        /// Owning epic id
        epic_id: TaskId,

        /// Subtask name
        name: String,

        /// Description
        #[arg(short = 'D', long)]
        description: Option<String>,

        /// Planned start (RFC 3339 or YYYY-MM-DDTHH:MM)
        #[arg(short, long)]
        start: Option<String>,

        /// Planned duration in minutes
        #[arg(short = 'm', long)]
        duration: Option<u32>,
    },

    /// List every task, epic, and subtask
    List,

    /// Show one entity by id
    Get {
        /// Entity id
        id: TaskId,
    },

    /// List the subtasks of an epic
    Subtasks {
        /// Epic id
        epic_id: TaskId,
    },

    /// Mark a task or subtask in progress
    Start {
        /// Entity id
        id: TaskId,
    },

    /// Mark a task or subtask done
    Done {
        /// Entity id
        id: TaskId,
    },

    /// Move a task or subtask to a new period, or clear it
    Schedule {
        /// Entity id
        id: TaskId,

        /// New start (RFC 3339 or YYYY-MM-DDTHH:MM)
        #[arg(short, long)]
        start: Option<String>,

        /// New duration in minutes
        #[arg(short = 'm', long)]
        duration: Option<u32>,

        /// Unschedule instead
        #[arg(long, conflicts_with_all = ["start", "duration"])]
        clear: bool,
    },

    /// Delete one entity by id
    Delete {
        /// Entity id
        id: TaskId,
    },

    /// Delete every entity of a kind
    Clear {
        /// What to delete
        kind: ClearKind,
    },

    /// Show recently viewed entities, oldest first
    History,

    /// Show scheduled items in start order
    Agenda,

    /// Run the daemon in foreground
    Daemon,

    /// Stop the running daemon
    DaemonStop,

    /// Check daemon status
    DaemonStatus,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ClearKind {
    /// All plain tasks
    Tasks,
    /// All epics, and with them all subtasks
    Epics,
    /// All subtasks; epics drop back to New
    Subtasks,
}
