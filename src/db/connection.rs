use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum WorkerMessage {
    Run(Job),
    Stop,
}

/// Joins the worker when the last `Database` clone goes away.
struct Worker {
    jobs: mpsc::Sender<WorkerMessage>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        if let Err(err) = self.jobs.send(WorkerMessage::Stop) {
            log_error!("session store worker already gone: {err}");
        }
        if let Err(err) = handle.join() {
            log_error!("session store worker panicked: {err:?}");
        }
    }
}

/// Where the worker opens its connection.
enum Location {
    File(PathBuf),
    Memory,
}

impl Location {
    fn open(&self) -> Result<Connection> {
        let conn = match self {
            Location::File(path) => Connection::open(path)
                .with_context(|| format!("failed to open SQLite database {}", path.display()))?,
            Location::Memory => {
                Connection::open_in_memory().context("failed to open in-memory SQLite database")?
            }
        };

        if let Location::File(_) = self {
            if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                log_error!("Failed to enable WAL mode: {err}");
            }
        }
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("failed to enable foreign keys")?;
        Ok(conn)
    }
}

/// Session-log store. One thread owns the SQLite connection; every query is
/// shipped to it as a closure and answered over a oneshot channel, so async
/// callers never block on disk.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    db_path: Option<Arc<PathBuf>>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let database = Self::start(Location::File(db_path.clone()))?;
        log_info!("Session store ready at {}", db_path.display());

        Ok(Self {
            db_path: Some(Arc::new(db_path)),
            ..database
        })
    }

    /// Throwaway store, gone when the last clone drops.
    pub fn in_memory() -> Result<Self> {
        Self::start(Location::Memory)
    }

    fn start(location: Location) -> Result<Self> {
        let (jobs_tx, jobs_rx) = mpsc::channel::<WorkerMessage>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread = thread::Builder::new()
            .name("drillrun-db".into())
            .spawn(move || {
                let mut conn = match location.open().and_then(|mut conn| {
                    run_migrations(&mut conn).context("failed to run database migrations")?;
                    Ok(conn)
                }) {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                if ready_tx.send(Ok(())).is_err() {
                    return;
                }
                serve(&mut conn, jobs_rx);
            })
            .context("failed to spawn session store thread")?;

        ready_rx
            .recv()
            .context("session store thread exited before it was ready")??;

        Ok(Self {
            worker: Arc::new(Worker {
                jobs: jobs_tx,
                thread: Mutex::new(Some(thread)),
            }),
            db_path: None,
        })
    }

    /// File backing this store; `None` for [`Database::in_memory`].
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref().map(PathBuf::as_path)
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let job: Job = Box::new(move |conn| {
            // The caller may have been cancelled; nothing to report then.
            let _ = reply_tx.send(task(conn));
        });

        self.worker
            .jobs
            .send(WorkerMessage::Run(job))
            .map_err(|_| anyhow!("session store thread is not running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("session store thread dropped the request"))?
    }
}

fn serve(conn: &mut Connection, jobs: mpsc::Receiver<WorkerMessage>) {
    for message in jobs {
        match message {
            WorkerMessage::Run(job) => job(conn),
            WorkerMessage::Stop => break,
        }
    }
    log_debug!("session store thread stopped");
}
