//! Background daemon serving the task store over a Unix socket.
//!
//! One request is handled at a time in the main loop, which is what gives
//! callers the store's single-writer ordering guarantee: every operation
//! observes the graph exactly as the previous one left it.

use crate::config::Config;
use crate::protocol::{Request, Response};
use crate::storage::{FileStore, SLATE_DIR};
use crate::store::StoreError;
use eyre::{Context, Report, Result};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Socket file name within the .slate directory.
const SOCKET_FILE: &str = "daemon.sock";

/// PID file name within the .slate directory.
const PID_FILE: &str = "daemon.pid";

/// Default tick interval in milliseconds.
const DEFAULT_FLUSH_INTERVAL_MS: u64 = 100;

/// Configuration for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Root directory containing .slate
    pub root: PathBuf,

    /// Tick interval for the periodic maintenance branch
    pub flush_interval: Duration,
}

impl DaemonConfig {
    /// Create config with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
        }
    }

    /// Apply the file config's daemon settings.
    pub fn with_config(mut self, config: &Config) -> Self {
        if let Some(ms) = config.flush_interval_ms {
            self.flush_interval = Duration::from_millis(ms);
        }
        self
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> PathBuf {
        self.root.join(SLATE_DIR).join(SOCKET_FILE)
    }

    /// Get the PID file path.
    pub fn pid_path(&self) -> PathBuf {
        self.root.join(SLATE_DIR).join(PID_FILE)
    }
}

/// The slate daemon.
pub struct Daemon {
    config: DaemonConfig,
    store: FileStore,
    shutdown: Arc<AtomicBool>,
}

impl Daemon {
    /// Create a new daemon instance over the file-backed store at the root.
    pub fn new(config: DaemonConfig) -> Result<Self> {
        let file_config = Config::load(&config.root).context("Failed to load config")?;
        let store = FileStore::open(&config.root, &file_config).context("Failed to open store")?;

        Ok(Self {
            config,
            store,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get a shutdown handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run the daemon (blocking).
    pub async fn run(&mut self) -> Result<()> {
        // Clean up any stale socket
        let socket_path = self.config.socket_path();
        if socket_path.exists() {
            fs::remove_file(&socket_path).ok();
        }

        // Write PID file
        let pid_path = self.config.pid_path();
        fs::write(&pid_path, std::process::id().to_string()).context("Failed to write PID file")?;

        // Create Unix socket listener
        let listener = UnixListener::bind(&socket_path).context("Failed to bind to Unix socket")?;
        listener
            .set_nonblocking(true)
            .context("Failed to set socket to non-blocking")?;

        log::info!("Daemon listening on {:?}", socket_path);

        // Create channel for client requests
        let (tx, mut rx) = mpsc::channel::<(Request, mpsc::Sender<Response>)>(100);

        // Spawn connection acceptor task
        let shutdown_flag = Arc::clone(&self.shutdown);
        let tx_clone = tx.clone();
        tokio::spawn(async move {
            Self::accept_connections(listener, tx_clone, shutdown_flag).await;
        });

        // Main event loop: requests are serialized through this single
        // consumer, so the store never sees concurrent mutation.
        let mut tick = interval(self.config.flush_interval);

        loop {
            tokio::select! {
                Some((request, response_tx)) = rx.recv() => {
                    let response = self.handle_request(request);
                    let _ = response_tx.send(response).await;
                }

                _ = tick.tick() => {
                    // Saves happen on every mutation; the tick only paces
                    // shutdown checks when no clients are connected.
                }
            }

            if self.shutdown.load(Ordering::Relaxed) {
                log::info!("Daemon shutting down");
                break;
            }
        }

        // Cleanup
        fs::remove_file(&socket_path).ok();
        fs::remove_file(&pid_path).ok();

        Ok(())
    }

    /// Accept connections in a background task.
    async fn accept_connections(
        listener: UnixListener,
        tx: mpsc::Sender<(Request, mpsc::Sender<Response>)>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    let tx_clone = tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_connection(stream, tx_clone).await {
                            log::warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // No pending connections, sleep briefly
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Handle a single client connection.
    async fn handle_connection(stream: UnixStream, tx: mpsc::Sender<(Request, mpsc::Sender<Response>)>) -> Result<()> {
        stream.set_nonblocking(false)?;

        let reader = BufReader::new(stream.try_clone()?);
        let mut writer = stream;

        for line in reader.lines() {
            let line = line.context("Failed to read line")?;
            if line.is_empty() {
                continue;
            }

            let request: Request = serde_json::from_str(&line).context("Failed to parse request")?;

            let is_shutdown = matches!(request, Request::Shutdown);

            // Send to main loop and wait for response
            let (resp_tx, mut resp_rx) = mpsc::channel(1);
            tx.send((request, resp_tx))
                .await
                .context("Failed to send request to daemon")?;

            if let Some(response) = resp_rx.recv().await {
                let response_json = serde_json::to_string(&response)?;
                writeln!(writer, "{}", response_json)?;
                writer.flush()?;
            }

            if is_shutdown {
                break;
            }
        }

        Ok(())
    }

    /// Handle a single request against the store.
    fn handle_request(&mut self, request: Request) -> Response {
        match request {
            Request::CreateTask { task } => match self.store.create_task(task) {
                Ok(task) => Response::Task { task },
                Err(e) => failure(e),
            },
            Request::UpdateTask { task } => match self.store.update_task(task) {
                Ok(task) => Response::Task { task },
                Err(e) => failure(e),
            },
            Request::GetTask { id } => match self.store.get_task(id) {
                Some(task) => Response::Task { task },
                None => Response::NotFound { id },
            },
            Request::ListTasks => Response::Tasks {
                tasks: self.store.get_all_tasks(),
            },
            Request::DeleteTask { id } => match self.store.delete_task(id) {
                Ok(task) => Response::Task { task },
                Err(e) => failure(e),
            },
            Request::DeleteAllTasks => match self.store.delete_all_tasks() {
                Ok(()) => Response::Ok,
                Err(e) => failure(e),
            },

            Request::CreateEpic { epic } => match self.store.create_epic(epic) {
                Ok(epic) => Response::Epic { epic },
                Err(e) => failure(e),
            },
            Request::UpdateEpic { epic } => match self.store.update_epic(epic) {
                Ok(epic) => Response::Epic { epic },
                Err(e) => failure(e),
            },
            Request::GetEpic { id } => match self.store.get_epic(id) {
                Some(epic) => Response::Epic { epic },
                None => Response::NotFound { id },
            },
            Request::ListEpics => Response::Epics {
                epics: self.store.get_all_epics(),
            },
            Request::DeleteEpic { id } => match self.store.delete_epic(id) {
                Ok(epic) => Response::Epic { epic },
                Err(e) => failure(e),
            },
            Request::DeleteAllEpics => match self.store.delete_all_epics() {
                Ok(()) => Response::Ok,
                Err(e) => failure(e),
            },

            Request::EpicSubtasks { id } => match self.store.epic_subtasks(id) {
                Ok(subtasks) => Response::Subtasks { subtasks },
                Err(e) => failure(e),
            },

            Request::CreateSubtask { subtask } => match self.store.create_subtask(subtask) {
                Ok(subtask) => Response::Subtask { subtask },
                Err(e) => failure(e),
            },
            Request::UpdateSubtask { subtask } => match self.store.update_subtask(subtask) {
                Ok(subtask) => Response::Subtask { subtask },
                Err(e) => failure(e),
            },
            Request::GetSubtask { id } => match self.store.get_subtask(id) {
                Some(subtask) => Response::Subtask { subtask },
                None => Response::NotFound { id },
            },
            Request::ListSubtasks => Response::Subtasks {
                subtasks: self.store.get_all_subtasks(),
            },
            Request::DeleteSubtask { id } => match self.store.delete_subtask(id) {
                Ok(subtask) => Response::Subtask { subtask },
                Err(e) => failure(e),
            },
            Request::DeleteAllSubtasks => match self.store.delete_all_subtasks() {
                Ok(()) => Response::Ok,
                Err(e) => failure(e),
            },

            Request::History => Response::Entities {
                entities: self.store.history(),
            },
            Request::Prioritized => Response::Entities {
                entities: self.store.prioritized(),
            },

            Request::Shutdown => {
                self.shutdown.store(true, Ordering::Relaxed);
                Response::Ok
            }

            Request::Ping => Response::Pong,
        }
    }
}

/// Map a store failure to the protocol: missing entity becomes NotFound,
/// any other store rejection becomes Rejected, I/O becomes Error.
fn failure(err: Report) -> Response {
    match err.downcast_ref::<StoreError>() {
        Some(StoreError::NotFound(id)) => Response::NotFound { id: *id },
        Some(rejection) => Response::rejected(rejection.to_string()),
        None => Response::error(err.to_string()),
    }
}

/// Check if a daemon is running for the given store path.
pub fn is_daemon_running(root: &Path) -> bool {
    let config = DaemonConfig::new(root);
    let socket_path = config.socket_path();
    let pid_path = config.pid_path();

    if !socket_path.exists() {
        return false;
    }

    // Check if PID file exists and process is alive
    if let Ok(pid_str) = fs::read_to_string(&pid_path)
        && let Ok(pid) = pid_str.trim().parse::<i32>()
    {
        // Signal 0 doesn't send a signal but checks existence
        unsafe {
            if libc::kill(pid, 0) == 0 {
                return true;
            }
        }
    }

    // Stale socket, clean up
    fs::remove_file(&socket_path).ok();
    fs::remove_file(&pid_path).ok();
    false
}

/// Start the daemon as a background process.
pub fn start_daemon(root: &Path) -> Result<()> {
    use std::process::Command;

    let exe = std::env::current_exe().context("Failed to get current executable")?;

    Command::new(exe)
        .args(["--dir", root.to_str().unwrap_or("."), "daemon"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("Failed to spawn daemon process")?;

    // Wait a bit for daemon to start
    std::thread::sleep(Duration::from_millis(100));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_daemon_config_paths() {
        let config = DaemonConfig::new("/test/path");
        assert_eq!(config.socket_path(), PathBuf::from("/test/path/.slate/daemon.sock"));
        assert_eq!(config.pid_path(), PathBuf::from("/test/path/.slate/daemon.pid"));
    }

    #[test]
    fn test_daemon_config_honors_file_config() {
        let file_config = Config {
            flush_interval_ms: Some(250),
            ..Config::default()
        };
        let config = DaemonConfig::new("/test/path").with_config(&file_config);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_daemon_creation() {
        let temp_dir = TempDir::new().unwrap();
        let config = DaemonConfig::new(temp_dir.path());
        assert!(Daemon::new(config).is_ok());
    }

    #[test]
    fn test_is_daemon_running_false() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!is_daemon_running(temp_dir.path()));
    }

    #[test]
    fn test_failure_mapping() {
        let not_found = failure(Report::new(StoreError::NotFound(4)));
        assert!(matches!(not_found, Response::NotFound { id: 4 }));

        let conflict = failure(Report::new(StoreError::SchedulingConflict));
        assert!(matches!(conflict, Response::Rejected { .. }));

        let io = failure(eyre::eyre!("disk on fire"));
        assert!(matches!(io, Response::Error { .. }));
    }
}
