//! CSV file persistence for the task store.
//!
//! One record per line under a fixed header:
//! `id,kind,name,status,description,startTime,durationMinutes,parentEpicId`.
//! Empty optional fields serialize as the empty string; timestamps are
//! RFC 3339. Fields containing commas, quotes or newlines are quoted.
//!
//! [`FileStore`] mirrors the store's surface and rewrites the file after
//! every mutating call; on open it restores entities, parent links, both
//! indices and the id counter.

use crate::config::Config;
use crate::store::TaskStore;
use crate::types::{Entity, Epic, Kind, Status, Subtask, Task, TaskId};
use chrono::{DateTime, Utc};
use eyre::{Context, Report, Result, bail, eyre};
use std::borrow::Cow;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Storage directory name.
pub const SLATE_DIR: &str = ".slate";

/// Data file within the storage directory.
const DATA_FILE: &str = "tasks.csv";

const HEADER: &str = "id,kind,name,status,description,startTime,durationMinutes,parentEpicId";

/// A [`TaskStore`] backed by a CSV file, saved after every mutation.
pub struct FileStore {
    path: PathBuf,
    store: TaskStore,
}

impl FileStore {
    /// Open the store rooted at `root`, loading `<root>/.slate/tasks.csv`
    /// when it exists. Malformed lines are logged and skipped, never fatal.
    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        let dir = root.join(SLATE_DIR);
        fs::create_dir_all(&dir).context("Failed to create .slate directory")?;
        let path = dir.join(DATA_FILE);

        let store = if path.exists() {
            let file = fs::File::open(&path).context("Failed to open tasks.csv")?;
            let mut tasks = Vec::new();
            let mut epics = Vec::new();
            let mut subtasks = Vec::new();

            for (number, line) in BufReader::new(file).lines().enumerate() {
                let line = line.context("Failed to read tasks.csv")?;
                if line.trim().is_empty() || line == HEADER {
                    continue;
                }
                match decode(&line) {
                    Ok(Entity::Task(task)) => tasks.push(task),
                    Ok(Entity::Epic(epic)) => epics.push(epic),
                    Ok(Entity::Subtask(subtask)) => subtasks.push(subtask),
                    Err(e) => log::warn!("skipping tasks.csv line {}: {}", number + 1, e),
                }
            }
            TaskStore::restore(tasks, epics, subtasks, config.history_capacity)
        } else {
            TaskStore::with_history_capacity(config.history_capacity)
        };

        Ok(Self { path, store })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let mut out = String::from(HEADER);
        out.push('\n');
        for task in self.store.get_all_tasks() {
            out.push_str(&encode(&Entity::Task(task)));
            out.push('\n');
        }
        for epic in self.store.get_all_epics() {
            out.push_str(&encode(&Entity::Epic(epic)));
            out.push('\n');
        }
        for subtask in self.store.get_all_subtasks() {
            out.push_str(&encode(&Entity::Subtask(subtask)));
            out.push('\n');
        }
        fs::write(&self.path, out).context("Failed to save tasks.csv")
    }

    pub fn create_task(&mut self, draft: Task) -> Result<Task> {
        let task = self.store.create_task(draft).map_err(Report::new)?;
        self.save()?;
        Ok(task)
    }

    pub fn create_epic(&mut self, draft: Epic) -> Result<Epic> {
        let epic = self.store.create_epic(draft).map_err(Report::new)?;
        self.save()?;
        Ok(epic)
    }

    pub fn create_subtask(&mut self, draft: Subtask) -> Result<Subtask> {
        let subtask = self.store.create_subtask(draft).map_err(Report::new)?;
        self.save()?;
        Ok(subtask)
    }

    pub fn update_task(&mut self, task: Task) -> Result<Task> {
        let task = self.store.update_task(task).map_err(Report::new)?;
        self.save()?;
        Ok(task)
    }

    pub fn update_epic(&mut self, epic: Epic) -> Result<Epic> {
        let epic = self.store.update_epic(epic).map_err(Report::new)?;
        self.save()?;
        Ok(epic)
    }

    pub fn update_subtask(&mut self, subtask: Subtask) -> Result<Subtask> {
        let subtask = self.store.update_subtask(subtask).map_err(Report::new)?;
        self.save()?;
        Ok(subtask)
    }

    pub fn delete_task(&mut self, id: TaskId) -> Result<Task> {
        let task = self.store.delete_task(id).map_err(Report::new)?;
        self.save()?;
        Ok(task)
    }

    pub fn delete_epic(&mut self, id: TaskId) -> Result<Epic> {
        let epic = self.store.delete_epic(id).map_err(Report::new)?;
        self.save()?;
        Ok(epic)
    }

    pub fn delete_subtask(&mut self, id: TaskId) -> Result<Subtask> {
        let subtask = self.store.delete_subtask(id).map_err(Report::new)?;
        self.save()?;
        Ok(subtask)
    }

    pub fn delete_all_tasks(&mut self) -> Result<()> {
        self.store.delete_all_tasks();
        self.save()
    }

    pub fn delete_all_epics(&mut self) -> Result<()> {
        self.store.delete_all_epics();
        self.save()
    }

    pub fn delete_all_subtasks(&mut self) -> Result<()> {
        self.store.delete_all_subtasks();
        self.save()
    }

    // Reads touch only in-memory state (the view history is not persisted),
    // so they pass straight through.

    pub fn get_task(&mut self, id: TaskId) -> Option<Task> {
        self.store.get_task(id)
    }

    pub fn get_epic(&mut self, id: TaskId) -> Option<Epic> {
        self.store.get_epic(id)
    }

    pub fn get_subtask(&mut self, id: TaskId) -> Option<Subtask> {
        self.store.get_subtask(id)
    }

    pub fn get_all_tasks(&self) -> Vec<Task> {
        self.store.get_all_tasks()
    }

    pub fn get_all_epics(&self) -> Vec<Epic> {
        self.store.get_all_epics()
    }

    pub fn get_all_subtasks(&self) -> Vec<Subtask> {
        self.store.get_all_subtasks()
    }

    pub fn epic_subtasks(&self, epic_id: TaskId) -> Result<Vec<Subtask>> {
        self.store.epic_subtasks(epic_id).map_err(Report::new)
    }

    pub fn history(&self) -> Vec<Entity> {
        self.store.history()
    }

    pub fn prioritized(&self) -> Vec<Entity> {
        self.store.prioritized()
    }
}

fn encode(entity: &Entity) -> String {
    let (description, start_time, duration_minutes, parent) = match entity {
        Entity::Task(t) => (&t.description, t.start_time, t.duration_minutes, None),
        Entity::Epic(e) => (&e.description, e.start_time, e.duration_minutes, None),
        Entity::Subtask(s) => (&s.description, s.start_time, s.duration_minutes, Some(s.epic_id)),
    };
    format!(
        "{},{},{},{},{},{},{},{}",
        entity.id(),
        kind_str(entity.kind()),
        escape(entity.name()),
        status_str(entity.status()),
        escape(description.as_deref().unwrap_or("")),
        start_time.map(|t| t.to_rfc3339()).unwrap_or_default(),
        duration_minutes.map(|m| m.to_string()).unwrap_or_default(),
        parent.map(|p| p.to_string()).unwrap_or_default(),
    )
}

fn decode(line: &str) -> Result<Entity> {
    let fields = split_fields(line);
    if fields.len() != 8 {
        bail!("expected 8 columns, got {}", fields.len());
    }

    let id: TaskId = fields[0].parse().context("bad id")?;
    let kind = parse_kind(&fields[1]).ok_or_else(|| eyre!("unknown kind '{}'", fields[1]))?;
    let name = fields[2].clone();
    let status = parse_status(&fields[3]).ok_or_else(|| eyre!("unknown status '{}'", fields[3]))?;
    let description = (!fields[4].is_empty()).then(|| fields[4].clone());
    let start_time = match fields[5].as_str() {
        "" => None,
        raw => Some(raw.parse::<DateTime<Utc>>().context("bad startTime")?),
    };
    let duration_minutes = match fields[6].as_str() {
        "" => None,
        raw => Some(raw.parse::<u32>().context("bad durationMinutes")?),
    };

    Ok(match kind {
        Kind::Task => Entity::Task(Task {
            id,
            name,
            description,
            status,
            start_time,
            duration_minutes,
        }),
        // Derived epic state is recomputed on restore; the stored columns
        // only keep the file human-readable.
        Kind::Epic => Entity::Epic(Epic {
            id,
            name,
            description,
            status,
            start_time,
            end_time: None,
            duration_minutes,
            subtask_ids: Vec::new(),
        }),
        Kind::Subtask => {
            let epic_id: TaskId = fields[7].parse().context("bad parentEpicId")?;
            Entity::Subtask(Subtask {
                id,
                name,
                description,
                status,
                epic_id,
                start_time,
                duration_minutes,
            })
        }
    })
}

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains(['"', ',', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                // Doubled quote is a literal quote, lone quote closes
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if current.is_empty() => quoted = true,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn kind_str(kind: Kind) -> &'static str {
    match kind {
        Kind::Task => "task",
        Kind::Epic => "epic",
        Kind::Subtask => "subtask",
    }
}

fn parse_kind(raw: &str) -> Option<Kind> {
    match raw {
        "task" => Some(Kind::Task),
        "epic" => Some(Kind::Epic),
        "subtask" => Some(Kind::Subtask),
        _ => None,
    }
}

fn status_str(status: Status) -> &'static str {
    match status {
        Status::New => "new",
        Status::InProgress => "in_progress",
        Status::Done => "done",
    }
}

fn parse_status(raw: &str) -> Option<Status> {
    match raw {
        "new" => Some(Status::New),
        "in_progress" => Some(Status::InProgress),
        "done" => Some(Status::Done),
        _ => None,
    }
}
