//! File watcher for the database.
//!
//! A `watch` session must notice writes made by other taskdeck processes.
//! SQLite in WAL mode touches the database file and its `-wal`/`-shm`
//! sidecars on commit, so a debounced watch on the database's directory is
//! enough: any event on one of those files bumps both store revision
//! channels, and the live-query machinery takes it from there.

use super::Store;
use notify::RecommendedWatcher;
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, Debouncer, new_debouncer};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Coalesces the burst of events a single commit produces.
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Handle keeping the watcher alive. Dropping it unwatches the directory and
/// ends the forwarding task.
pub struct StoreWatcherHandle {
    _debouncer: Debouncer<RecommendedWatcher>,
    _task_handle: tokio::task::JoinHandle<()>,
}

/// Start watching the database file for external writes.
pub fn start_store_watcher(store: Store, db_path: &Path) -> anyhow::Result<StoreWatcherHandle> {
    let file_name = db_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("database path has no file name: {}", db_path.display()))?
        .to_string();
    let parent = match db_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let (notify_tx, notify_rx) = mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, notify_tx)?;
    debouncer
        .watcher()
        .watch(parent, notify::RecursiveMode::NonRecursive)?;
    info!("Watching database file: {}", db_path.display());

    // The sync notify channel needs a blocking receiver.
    let task_handle = tokio::task::spawn_blocking(move || {
        process_notify_events(notify_rx, store, &file_name);
    });

    Ok(StoreWatcherHandle {
        _debouncer: debouncer,
        _task_handle: task_handle,
    })
}

/// Forward debounced filesystem events onto the store revision channels.
/// Exits when the debouncer (held by the handle) is dropped.
fn process_notify_events(
    rx: mpsc::Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    store: Store,
    db_file_name: &str,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().any(|event| {
                    matches!(
                        event.kind,
                        DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                    ) && is_database_file(&event.path, db_file_name)
                });
                if relevant {
                    debug!("Database changed on disk");
                    store.notify_external_change();
                }
            }
            Ok(Err(e)) => {
                error!("Database watcher error: {}", e);
            }
            Err(_) => {
                info!("Database watcher stopped");
                return;
            }
        }
    }
}

/// Whether a path is the database file or one of its WAL sidecars
/// (`tasks.db`, `tasks.db-wal`, `tasks.db-shm`).
fn is_database_file(path: &Path, db_file_name: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with(db_file_name))
}
