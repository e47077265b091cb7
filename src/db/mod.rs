//! SQLite store for tasks and subtasks.
//!
//! The connection lives behind a mutex; every committed mutation bumps a
//! per-table revision channel, which is what drives live queries (see
//! [`crate::live`]). Cross-process writes are folded in by the optional file
//! watcher in [`watcher`].

pub mod subtasks;
pub mod tasks;
pub mod watcher;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Store handle wrapping a SQLite connection plus the revision channels
/// observers hang off of. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    tasks_rev: Arc<watch::Sender<u64>>,
    subtasks_rev: Arc<watch::Sender<u64>>,
}

impl Store {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent access
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        let store = Self::from_conn(conn);
        store.run_migrations()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let store = Self::from_conn(conn);
        store.run_migrations()?;
        Ok(store)
    }

    fn from_conn(conn: Connection) -> Self {
        let (tasks_rev, _) = watch::channel(0u64);
        let (subtasks_rev, _) = watch::channel(0u64);
        Self {
            conn: Arc::new(Mutex::new(conn)),
            tasks_rev: Arc::new(tasks_rev),
            subtasks_rev: Arc::new(subtasks_rev),
        }
    }

    /// Run database migrations.
    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let report = embedded::migrations::runner().run(&mut *conn)?;
        for migration in report.applied_migrations() {
            debug!(version = %migration.version(), name = migration.name(), "applied migration");
        }
        Ok(())
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    /// Execute a function with mutable access to the connection (for transactions).
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        f(&mut conn)
    }

    /// Subscribe to the task-table revision counter.
    pub fn watch_tasks(&self) -> watch::Receiver<u64> {
        self.tasks_rev.subscribe()
    }

    /// Subscribe to the subtask-table revision counter.
    pub fn watch_subtasks(&self) -> watch::Receiver<u64> {
        self.subtasks_rev.subscribe()
    }

    /// Bump the task revision. Called after a committed task write.
    pub(crate) fn notify_tasks_changed(&self) {
        self.tasks_rev.send_modify(|rev| *rev += 1);
    }

    /// Bump the subtask revision. Called after a committed subtask write.
    pub(crate) fn notify_subtasks_changed(&self) {
        self.subtasks_rev.send_modify(|rev| *rev += 1);
    }

    /// Bump both revisions. Used by the file watcher, which cannot tell which
    /// table an external write touched.
    pub fn notify_external_change(&self) {
        self.notify_tasks_changed();
        self.notify_subtasks_changed();
    }
}

/// Convert a stored epoch-millisecond value back to a UTC instant.
/// Out-of-range values (never produced by this crate) clamp to the epoch.
pub(crate) fn from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}
