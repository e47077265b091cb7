//! Live query runtime.
//!
//! A live query is a `watch` channel fed by a combinator task: the store's
//! revision channels are merged into one bump stream, and every bump re-runs
//! the query closure against the store, publishing a complete new snapshot.
//! Consecutive identical snapshots are suppressed, so observers only wake for
//! real changes and never see partial state. Dropping the [`LiveQuery`]
//! handle aborts the combinator and its forwarders, which is all the
//! subscription lifecycle there is.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Handle to a live query result. The latest snapshot is always available
/// without waiting; `changed` suspends until a newer one is published.
pub struct LiveQuery<T> {
    rx: watch::Receiver<T>,
    tasks: Vec<JoinHandle<()>>,
}

impl<T: Clone> LiveQuery<T> {
    /// The latest snapshot.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot. Returns false if the query has shut down
    /// (its upstream sources are gone).
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// A bare receiver for consumers that outlive this handle's borrow.
    pub fn receiver(&self) -> watch::Receiver<T> {
        self.rx.clone()
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Spawn a live query over the given revision sources.
///
/// The closure runs once synchronously for the initial snapshot (falling back
/// to `T::default()` with a warning if it fails), then once per revision
/// bump. A failed recompute keeps the previous snapshot; live views degrade
/// to stale rather than tearing down.
pub(crate) fn spawn_live<T, F>(sources: Vec<watch::Receiver<u64>>, compute: F) -> LiveQuery<T>
where
    T: Clone + PartialEq + Default + Send + Sync + 'static,
    F: Fn() -> anyhow::Result<T> + Send + 'static,
{
    let initial = compute().unwrap_or_else(|e| {
        warn!("Live query initial compute failed: {e:#}");
        T::default()
    });
    let (tx, rx) = watch::channel(initial);

    // Merge all sources into one bump stream. Each forwarder ends on its own
    // when its source sender is dropped.
    let (merged_tx, mut merged_rx) = watch::channel(0u64);
    let merged_tx = Arc::new(merged_tx);
    let mut tasks: Vec<JoinHandle<()>> = sources
        .into_iter()
        .map(|mut source| {
            let merged = Arc::clone(&merged_tx);
            tokio::spawn(async move {
                while source.changed().await.is_ok() {
                    merged.send_modify(|bumps| *bumps += 1);
                }
            })
        })
        .collect();

    tasks.push(tokio::spawn(async move {
        while merged_rx.changed().await.is_ok() {
            match compute() {
                Ok(snapshot) => {
                    tx.send_if_modified(|current| {
                        if *current == snapshot {
                            false
                        } else {
                            *current = snapshot;
                            true
                        }
                    });
                }
                Err(e) => warn!("Live query recompute failed, keeping last snapshot: {e:#}"),
            }
        }
    }));

    LiveQuery { rx, tasks }
}
