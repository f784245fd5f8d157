//! Slate CLI - hierarchical task tracking with conflict-checked scheduling.

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Report, Result, bail};
use log::info;
use slate::{
    Client, Config, Daemon, DaemonConfig, Entity, Epic, FileStore, Kind, Status, StoreError,
    Subtask, Task, TaskId, is_daemon_running,
};
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::{Cli, ClearKind, Command};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slate")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("slate.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn get_store_dir(cli: &Cli) -> PathBuf {
    cli.dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn open_store(root: &std::path::Path) -> Result<FileStore> {
    let config = Config::load(root).context("Failed to load config")?;
    FileStore::open(root, &config).context("Failed to open store")
}

fn format_status(status: &Status) -> ColoredString {
    match status {
        Status::New => "new".green(),
        Status::InProgress => "in_progress".yellow(),
        Status::Done => "done".blue(),
    }
}

fn kind_name(kind: Kind) -> &'static str {
    match kind {
        Kind::Task => "task",
        Kind::Epic => "epic",
        Kind::Subtask => "subtask",
    }
}

fn format_period(start: Option<DateTime<Utc>>, minutes: Option<u32>) -> String {
    match (start, minutes) {
        (Some(start), Some(minutes)) => {
            format!(" {} +{}m", start.format("%Y-%m-%d %H:%M"), minutes)
        }
        (Some(start), None) => format!(" {}", start.format("%Y-%m-%d %H:%M")),
        (None, Some(minutes)) => format!(" +{}m", minutes),
        (None, None) => String::new(),
    }
}

fn task_line(task: &Task) -> String {
    format!(
        "{} {} {}{}",
        format_status(&task.status),
        task.id.to_string().cyan(),
        task.name,
        format_period(task.start_time, task.duration_minutes).dimmed()
    )
}

fn subtask_line(subtask: &Subtask) -> String {
    format!(
        "{} {} {}{}",
        format_status(&subtask.status),
        subtask.id.to_string().cyan(),
        subtask.name,
        format_period(subtask.start_time, subtask.duration_minutes).dimmed()
    )
}

fn epic_line(epic: &Epic) -> String {
    format!(
        "{} {} {}{}",
        format_status(&epic.status),
        epic.id.to_string().cyan(),
        epic.name,
        format_period(epic.start_time, epic.duration_minutes).dimmed()
    )
}

fn entity_line(entity: &Entity) -> String {
    format!(
        "{} {} {} {}{}",
        format_status(&entity.status()),
        entity.id().to_string().cyan(),
        kind_name(entity.kind()).dimmed(),
        entity.name(),
        format_period(entity.start_time(), entity.duration_minutes()).dimmed()
    )
}

/// Accept RFC 3339 or the shorter local form `YYYY-MM-DDTHH:MM` (read as UTC).
fn parse_start(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = raw.parse::<DateTime<Utc>>() {
        return Ok(parsed);
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .context("expected RFC 3339 or YYYY-MM-DDTHH:MM")?;
    Ok(naive.and_utc())
}

fn is_not_found(err: &Report) -> bool {
    matches!(err.downcast_ref::<StoreError>(), Some(StoreError::NotFound(_)))
}

fn set_status(store: &mut FileStore, id: TaskId, status: Status) -> Result<Entity> {
    if let Some(task) = store.get_task(id) {
        let updated = store.update_task(Task { status, ..task })?;
        return Ok(Entity::Task(updated));
    }
    if let Some(subtask) = store.get_subtask(id) {
        let updated = store.update_subtask(Subtask { status, ..subtask })?;
        return Ok(Entity::Subtask(updated));
    }
    if store.get_epic(id).is_some() {
        bail!("epic {} takes its status from its subtasks", id);
    }
    bail!("no entity with id {}", id);
}

fn reschedule(
    store: &mut FileStore,
    id: TaskId,
    start: Option<DateTime<Utc>>,
    duration: Option<u32>,
    clear: bool,
) -> Result<Entity> {
    if let Some(task) = store.get_task(id) {
        let (start_time, duration_minutes) = if clear {
            (None, None)
        } else {
            (start.or(task.start_time), duration.or(task.duration_minutes))
        };
        let updated = store.update_task(Task {
            start_time,
            duration_minutes,
            ..task
        })?;
        return Ok(Entity::Task(updated));
    }
    if let Some(subtask) = store.get_subtask(id) {
        let (start_time, duration_minutes) = if clear {
            (None, None)
        } else {
            (start.or(subtask.start_time), duration.or(subtask.duration_minutes))
        };
        let updated = store.update_subtask(Subtask {
            start_time,
            duration_minutes,
            ..subtask
        })?;
        return Ok(Entity::Subtask(updated));
    }
    if store.get_epic(id).is_some() {
        bail!("epic {} takes its time window from its subtasks", id);
    }
    bail!("no entity with id {}", id);
}

fn delete_any(store: &mut FileStore, id: TaskId) -> Result<Entity> {
    match store.delete_task(id) {
        Ok(task) => return Ok(Entity::Task(task)),
        Err(e) if !is_not_found(&e) => return Err(e),
        Err(_) => {}
    }
    match store.delete_epic(id) {
        Ok(epic) => return Ok(Entity::Epic(epic)),
        Err(e) if !is_not_found(&e) => return Err(e),
        Err(_) => {}
    }
    Ok(Entity::Subtask(store.delete_subtask(id)?))
}

fn run(cli: Cli) -> Result<()> {
    let store_dir = get_store_dir(&cli);

    match cli.command {
        Command::Add {
            name,
            description,
            start,
            duration,
        } => {
            let mut store = open_store(&store_dir)?;
            let start_time = start.as_deref().map(parse_start).transpose()?;
            let task = store
                .create_task(Task::new(name, description, Status::New, start_time, duration))
                .context("Failed to create task")?;

            println!("{} Created: {}", "✓".green(), task_line(&task));
        }

        Command::Epic { name, description } => {
            let mut store = open_store(&store_dir)?;
            let epic = store
                .create_epic(Epic::new(name, description))
                .context("Failed to create epic")?;

            println!("{} Created: {}", "✓".green(), epic_line(&epic));
        }

        Command::Sub {
            epic_id,
            name,
            description,
            start,
            duration,
        } => {
            let mut store = open_store(&store_dir)?;
            let start_time = start.as_deref().map(parse_start).transpose()?;
            let subtask = store
                .create_subtask(Subtask::new(
                    name,
                    description,
                    Status::New,
                    epic_id,
                    start_time,
                    duration,
                ))
                .context("Failed to create subtask")?;

            println!("{} Created: {}", "✓".green(), subtask_line(&subtask));
        }

        Command::List => {
            let store = open_store(&store_dir)?;
            let tasks = store.get_all_tasks();
            let epics = store.get_all_epics();

            if tasks.is_empty() && epics.is_empty() {
                println!("{}", "Nothing tracked yet".dimmed());
            }
            for task in &tasks {
                println!("{}", task_line(task));
            }
            for epic in &epics {
                println!("{}", epic_line(epic));
                for subtask in store.epic_subtasks(epic.id)? {
                    println!("  --> {}", subtask_line(&subtask));
                }
            }
        }

        Command::Get { id } => {
            let mut store = open_store(&store_dir)?;
            if let Some(task) = store.get_task(id) {
                print_common(id, "task", &task.name, &task.status, &task.description);
                print_period(task.start_time, task.end_time(), task.duration_minutes);
            } else if let Some(epic) = store.get_epic(id) {
                print_common(id, "epic", &epic.name, &epic.status, &epic.description);
                print_period(epic.start_time, epic.end_time, epic.duration_minutes);
                if !epic.subtask_ids.is_empty() {
                    let ids: Vec<String> =
                        epic.subtask_ids.iter().map(|sid| sid.to_string()).collect();
                    println!("{}: {}", "Subtasks".bold(), ids.join(", "));
                }
            } else if let Some(subtask) = store.get_subtask(id) {
                print_common(id, "subtask", &subtask.name, &subtask.status, &subtask.description);
                println!("{}: {}", "Epic".bold(), subtask.epic_id.to_string().cyan());
                print_period(subtask.start_time, subtask.end_time(), subtask.duration_minutes);
            } else {
                eprintln!("{} No entity with id {}", "✗".red(), id);
                std::process::exit(1);
            }
        }

        Command::Subtasks { epic_id } => {
            let store = open_store(&store_dir)?;
            let subtasks = store.epic_subtasks(epic_id).context("Failed to list subtasks")?;

            if subtasks.is_empty() {
                println!("{}", "No subtasks".dimmed());
            } else {
                for subtask in subtasks {
                    println!("{}", subtask_line(&subtask));
                }
            }
        }

        Command::Start { id } => {
            let mut store = open_store(&store_dir)?;
            let entity = set_status(&mut store, id, Status::InProgress)?;
            println!("{} Started: {}", "→".blue(), entity_line(&entity));
        }

        Command::Done { id } => {
            let mut store = open_store(&store_dir)?;
            let entity = set_status(&mut store, id, Status::Done)?;
            println!("{} Done: {}", "✓".green(), entity_line(&entity));
        }

        Command::Schedule {
            id,
            start,
            duration,
            clear,
        } => {
            let mut store = open_store(&store_dir)?;
            let start_time = start.as_deref().map(parse_start).transpose()?;
            let entity = reschedule(&mut store, id, start_time, duration, clear)?;
            if clear {
                println!("{} Unscheduled: {}", "✓".green(), entity_line(&entity));
            } else {
                println!("{} Scheduled: {}", "✓".green(), entity_line(&entity));
            }
        }

        Command::Delete { id } => {
            let mut store = open_store(&store_dir)?;
            let entity = delete_any(&mut store, id)?;
            println!("{} Deleted: {}", "✓".green(), entity_line(&entity));
        }

        Command::Clear { kind } => {
            let mut store = open_store(&store_dir)?;
            match kind {
                ClearKind::Tasks => store.delete_all_tasks()?,
                ClearKind::Epics => store.delete_all_epics()?,
                ClearKind::Subtasks => store.delete_all_subtasks()?,
            }
            println!("{} Cleared", "✓".green());
        }

        Command::History => {
            let store = open_store(&store_dir)?;
            let entities = store.history();

            if entities.is_empty() {
                println!("{}", "No views recorded".dimmed());
            } else {
                for entity in entities {
                    println!("{}", entity_line(&entity));
                }
            }
        }

        Command::Agenda => {
            let store = open_store(&store_dir)?;
            let entities = store.prioritized();

            if entities.is_empty() {
                println!("{}", "Nothing scheduled".dimmed());
            } else {
                for entity in entities {
                    println!("{}", entity_line(&entity));
                }
            }
        }

        Command::Daemon => {
            println!("{} Starting daemon for {}", "→".blue(), store_dir.display());

            let file_config = Config::load(&store_dir).context("Failed to load config")?;
            let config = DaemonConfig::new(&store_dir).with_config(&file_config);
            let mut daemon = Daemon::new(config).context("Failed to create daemon")?;

            let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
            rt.block_on(async { daemon.run().await }).context("Daemon error")?;
        }

        Command::DaemonStop => {
            if !is_daemon_running(&store_dir) {
                println!("{} Daemon is not running", "✗".red());
                std::process::exit(1);
            }

            let mut client = Client::connect(&store_dir, false).context("Failed to connect to daemon")?;
            client.shutdown().context("Failed to shutdown daemon")?;
            println!("{} Daemon stopped", "✓".green());
        }

        Command::DaemonStatus => {
            if is_daemon_running(&store_dir) {
                println!("{} Daemon is running", "✓".green());

                if let Ok(mut client) = Client::connect(&store_dir, false)
                    && client.ping().is_ok()
                {
                    println!("  {} Responding to requests", "✓".green());
                }
            } else {
                println!("{} Daemon is not running", "✗".red());
            }
        }
    }

    Ok(())
}

fn print_common(id: TaskId, kind: &str, name: &str, status: &Status, description: &Option<String>) {
    println!("{}: {}", "ID".bold(), id.to_string().cyan());
    println!("{}: {}", "Kind".bold(), kind);
    println!("{}: {}", "Name".bold(), name);
    println!("{}: {}", "Status".bold(), format_status(status));
    if let Some(description) = description {
        println!("{}: {}", "Description".bold(), description);
    }
}

fn print_period(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>, minutes: Option<u32>) {
    if let Some(start) = start {
        println!("{}: {}", "Start".bold(), start);
    }
    if let Some(end) = end {
        println!("{}: {}", "End".bold(), end);
    }
    if let Some(minutes) = minutes {
        println!("{}: {}m", "Duration".bold(), minutes);
    }
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
