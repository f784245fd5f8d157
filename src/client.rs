//! Client for connecting to the slate daemon.

use crate::daemon::{DaemonConfig, is_daemon_running, start_daemon};
use crate::protocol::{Request, Response};
use crate::types::{Entity, Epic, Subtask, Task, TaskId};
use eyre::{Context, Result, bail};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client for communicating with the slate daemon.
pub struct Client {
    root: PathBuf,
    stream: UnixStream,
}

impl Client {
    /// Connect to the daemon, optionally auto-starting it if not running.
    pub fn connect(root: &Path, auto_start: bool) -> Result<Self> {
        let config = DaemonConfig::new(root);
        let socket_path = config.socket_path();

        let stream = match UnixStream::connect(&socket_path) {
            Ok(stream) => stream,
            Err(_) if auto_start => {
                if !is_daemon_running(root) {
                    start_daemon(root).context("Failed to auto-start daemon")?;

                    // Wait for daemon to be ready
                    let mut attempts = 0;
                    loop {
                        if attempts > 20 {
                            bail!("Daemon failed to start in time");
                        }
                        std::thread::sleep(Duration::from_millis(50));
                        if let Ok(stream) = UnixStream::connect(&socket_path) {
                            break stream;
                        }
                        attempts += 1;
                    }
                } else {
                    UnixStream::connect(&socket_path).context("Failed to connect to daemon")?
                }
            }
            Err(e) => {
                bail!("Failed to connect to daemon: {}. Is it running?", e);
            }
        };

        stream
            .set_read_timeout(Some(Duration::from_secs(30)))
            .context("Failed to set read timeout")?;

        Ok(Self {
            root: root.to_path_buf(),
            stream,
        })
    }

    /// Get the store root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Send a request and receive a response.
    fn request(&mut self, request: Request) -> Result<Response> {
        let request_json = serde_json::to_string(&request)?;
        writeln!(self.stream, "{}", request_json)?;
        self.stream.flush()?;

        let mut reader = BufReader::new(&self.stream);
        let mut response_line = String::new();
        reader.read_line(&mut response_line)?;

        let response: Response = serde_json::from_str(&response_line)?;
        Ok(response)
    }

    pub fn create_task(&mut self, task: Task) -> Result<Task> {
        expect_task(self.request(Request::CreateTask { task })?)
    }

    pub fn update_task(&mut self, task: Task) -> Result<Task> {
        expect_task(self.request(Request::UpdateTask { task })?)
    }

    pub fn get_task(&mut self, id: TaskId) -> Result<Option<Task>> {
        match self.request(Request::GetTask { id })? {
            Response::Task { task } => Ok(Some(task)),
            Response::NotFound { .. } => Ok(None),
            other => unexpected(other),
        }
    }

    pub fn list_tasks(&mut self) -> Result<Vec<Task>> {
        match self.request(Request::ListTasks)? {
            Response::Tasks { tasks } => Ok(tasks),
            other => unexpected(other),
        }
    }

    pub fn delete_task(&mut self, id: TaskId) -> Result<Task> {
        expect_task(self.request(Request::DeleteTask { id })?)
    }

    pub fn delete_all_tasks(&mut self) -> Result<()> {
        expect_ok(self.request(Request::DeleteAllTasks)?)
    }

    pub fn create_epic(&mut self, epic: Epic) -> Result<Epic> {
        expect_epic(self.request(Request::CreateEpic { epic })?)
    }

    pub fn update_epic(&mut self, epic: Epic) -> Result<Epic> {
        expect_epic(self.request(Request::UpdateEpic { epic })?)
    }

    pub fn get_epic(&mut self, id: TaskId) -> Result<Option<Epic>> {
        match self.request(Request::GetEpic { id })? {
            Response::Epic { epic } => Ok(Some(epic)),
            Response::NotFound { .. } => Ok(None),
            other => unexpected(other),
        }
    }

    pub fn list_epics(&mut self) -> Result<Vec<Epic>> {
        match self.request(Request::ListEpics)? {
            Response::Epics { epics } => Ok(epics),
            other => unexpected(other),
        }
    }

    pub fn delete_epic(&mut self, id: TaskId) -> Result<Epic> {
        expect_epic(self.request(Request::DeleteEpic { id })?)
    }

    pub fn delete_all_epics(&mut self) -> Result<()> {
        expect_ok(self.request(Request::DeleteAllEpics)?)
    }

    /// Subtasks of one epic, in the epic's order.
    pub fn epic_subtasks(&mut self, id: TaskId) -> Result<Vec<Subtask>> {
        match self.request(Request::EpicSubtasks { id })? {
            Response::Subtasks { subtasks } => Ok(subtasks),
            other => unexpected(other),
        }
    }

    pub fn create_subtask(&mut self, subtask: Subtask) -> Result<Subtask> {
        expect_subtask(self.request(Request::CreateSubtask { subtask })?)
    }

    pub fn update_subtask(&mut self, subtask: Subtask) -> Result<Subtask> {
        expect_subtask(self.request(Request::UpdateSubtask { subtask })?)
    }

    pub fn get_subtask(&mut self, id: TaskId) -> Result<Option<Subtask>> {
        match self.request(Request::GetSubtask { id })? {
            Response::Subtask { subtask } => Ok(Some(subtask)),
            Response::NotFound { .. } => Ok(None),
            other => unexpected(other),
        }
    }

    pub fn list_subtasks(&mut self) -> Result<Vec<Subtask>> {
        match self.request(Request::ListSubtasks)? {
            Response::Subtasks { subtasks } => Ok(subtasks),
            other => unexpected(other),
        }
    }

    pub fn delete_subtask(&mut self, id: TaskId) -> Result<Subtask> {
        expect_subtask(self.request(Request::DeleteSubtask { id })?)
    }

    pub fn delete_all_subtasks(&mut self) -> Result<()> {
        expect_ok(self.request(Request::DeleteAllSubtasks)?)
    }

    /// Recently viewed entities, oldest first.
    pub fn history(&mut self) -> Result<Vec<Entity>> {
        match self.request(Request::History)? {
            Response::Entities { entities } => Ok(entities),
            other => unexpected(other),
        }
    }

    /// Scheduled items ordered by start time.
    pub fn prioritized(&mut self) -> Result<Vec<Entity>> {
        match self.request(Request::Prioritized)? {
            Response::Entities { entities } => Ok(entities),
            other => unexpected(other),
        }
    }

    /// Shutdown the daemon.
    pub fn shutdown(&mut self) -> Result<()> {
        expect_ok(self.request(Request::Shutdown)?)
    }

    /// Ping the daemon.
    pub fn ping(&mut self) -> Result<()> {
        match self.request(Request::Ping)? {
            Response::Pong => Ok(()),
            other => unexpected(other),
        }
    }
}

fn expect_task(response: Response) -> Result<Task> {
    match response {
        Response::Task { task } => Ok(task),
        other => unexpected(other),
    }
}

fn expect_epic(response: Response) -> Result<Epic> {
    match response {
        Response::Epic { epic } => Ok(epic),
        other => unexpected(other),
    }
}

fn expect_subtask(response: Response) -> Result<Subtask> {
    match response {
        Response::Subtask { subtask } => Ok(subtask),
        other => unexpected(other),
    }
}

fn expect_ok(response: Response) -> Result<()> {
    match response {
        Response::Ok => Ok(()),
        other => unexpected(other),
    }
}

fn unexpected<T>(response: Response) -> Result<T> {
    match response {
        Response::NotFound { id } => bail!("no entity with id {}", id),
        Response::Rejected { message } => bail!("{}", message),
        Response::Error { message } => bail!("{}", message),
        _ => bail!("Unexpected response"),
    }
}

#[cfg(test)]
mod tests {
    // Exercising the client needs a running daemon; the protocol itself is
    // covered in protocol.rs and the dispatch in daemon.rs.
}
