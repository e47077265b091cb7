//! Durable preferences with live observation.
//!
//! One YAML document holds every preference. Reads come from an `ArcSwap`
//! snapshot so hot paths never touch the filesystem; writes persist the full
//! document first (temp file + rename), then swap the snapshot and bump the
//! revision channel for live consumers. An unreadable document logs a
//! warning and falls back to defaults; the file is only rewritten on the
//! next successful set.

use crate::focus::{FOCUS_LIMIT_DEFAULT, clamp_limit};
use crate::types::SortOption;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::warn;

/// The preference document. Missing keys deserialize to their defaults, so
/// documents written by older versions keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub sort_option: SortOption,
    pub focus_task_limit: usize,
    pub focus_pinned_task_ids: BTreeSet<String>,
    pub notes_expanded: bool,
    pub deadlines_expanded: bool,
    pub subtasks_expanded: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            sort_option: SortOption::default(),
            focus_task_limit: FOCUS_LIMIT_DEFAULT,
            focus_pinned_task_ids: BTreeSet::new(),
            notes_expanded: false,
            deadlines_expanded: false,
            subtasks_expanded: false,
        }
    }
}

/// Handle to the preference document. Cheap to clone; all clones share the
/// snapshot and revision channel.
#[derive(Clone)]
pub struct PrefStore {
    path: PathBuf,
    snapshot: Arc<ArcSwap<Preferences>>,
    rev: Arc<watch::Sender<u64>>,
    // Serializes read-modify-write cycles between in-process writers.
    write_lock: Arc<Mutex<()>>,
}

impl PrefStore {
    /// Open the document at `path`, falling back to defaults if it is
    /// missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prefs = load_or_default(&path);
        let (rev, _) = watch::channel(0u64);
        Self {
            path,
            snapshot: Arc::new(ArcSwap::from_pointee(prefs)),
            rev: Arc::new(rev),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The current preferences snapshot.
    pub fn current(&self) -> Preferences {
        self.snapshot.load().as_ref().clone()
    }

    /// Subscribe to the revision counter; bumped once per successful write.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.rev.subscribe()
    }

    pub fn set_sort_option(&self, sort: SortOption) -> Result<()> {
        self.mutate(|prefs| prefs.sort_option = sort)
    }

    /// Clamped into the supported focus range before persisting.
    pub fn set_focus_task_limit(&self, limit: usize) -> Result<()> {
        self.mutate(|prefs| prefs.focus_task_limit = clamp_limit(limit))
    }

    /// Flip pin membership. Returns true when the task ended up pinned.
    pub fn toggle_pin(&self, task_id: &str) -> Result<bool> {
        let mut pinned_now = false;
        self.mutate(|prefs| {
            if !prefs.focus_pinned_task_ids.remove(task_id) {
                prefs.focus_pinned_task_ids.insert(task_id.to_string());
                pinned_now = true;
            }
        })?;
        Ok(pinned_now)
    }

    pub fn set_notes_expanded(&self, expanded: bool) -> Result<()> {
        self.mutate(|prefs| prefs.notes_expanded = expanded)
    }

    pub fn set_deadlines_expanded(&self, expanded: bool) -> Result<()> {
        self.mutate(|prefs| prefs.deadlines_expanded = expanded)
    }

    pub fn set_subtasks_expanded(&self, expanded: bool) -> Result<()> {
        self.mutate(|prefs| prefs.subtasks_expanded = expanded)
    }

    /// Read-modify-write: persist to disk first, then publish the new
    /// snapshot. A failed write leaves both the file and the snapshot
    /// untouched.
    fn mutate(&self, f: impl FnOnce(&mut Preferences)) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut prefs = self.current();
        f(&mut prefs);
        write_document(&self.path, &prefs)?;
        self.snapshot.store(Arc::new(prefs));
        self.rev.send_modify(|rev| *rev += 1);
        Ok(())
    }
}

fn load_or_default(path: &Path) -> Preferences {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str(&content) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!(
                    "Unreadable preferences at {}, using defaults: {}",
                    path.display(),
                    e
                );
                Preferences::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
        Err(e) => {
            warn!(
                "Cannot read preferences at {}, using defaults: {}",
                path.display(),
                e
            );
            Preferences::default()
        }
    }
}

/// Serialize the whole document and rename it into place so a crash cannot
/// leave a torn file.
fn write_document(path: &Path, prefs: &Preferences) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating preference directory {}", parent.display()))?;
    }
    let yaml = serde_yaml::to_string(prefs)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, yaml)
        .with_context(|| format!("writing preferences to {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replacing preferences at {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store(dir: &TempDir) -> PrefStore {
        PrefStore::open(dir.path().join("prefs.yaml"))
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);
        assert_eq!(store.current(), Preferences::default());
        assert_eq!(store.current().focus_task_limit, FOCUS_LIMIT_DEFAULT);
    }

    #[test]
    fn test_writes_persist_across_reopen() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);
        store.set_sort_option(SortOption::Created).unwrap();
        store.set_focus_task_limit(8).unwrap();
        store.toggle_pin("task-1").unwrap();

        let reopened = temp_store(&dir);
        let prefs = reopened.current();
        assert_eq!(prefs.sort_option, SortOption::Created);
        assert_eq!(prefs.focus_task_limit, 8);
        assert!(prefs.focus_pinned_task_ids.contains("task-1"));
    }

    #[test]
    fn test_limit_is_clamped_on_write() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);

        store.set_focus_task_limit(0).unwrap();
        assert_eq!(store.current().focus_task_limit, 1);

        store.set_focus_task_limit(25).unwrap();
        assert_eq!(store.current().focus_task_limit, 10);
    }

    #[test]
    fn test_toggle_pin_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);

        assert!(store.toggle_pin("t").unwrap());
        assert!(store.current().focus_pinned_task_ids.contains("t"));
        assert!(!store.toggle_pin("t").unwrap());
        assert!(store.current().focus_pinned_task_ids.is_empty());
    }

    #[test]
    fn test_corrupt_document_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.yaml");
        std::fs::write(&path, ": not [ valid yaml").unwrap();

        let store = PrefStore::open(&path);
        assert_eq!(store.current(), Preferences::default());
    }

    #[test]
    fn test_every_write_bumps_the_revision() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);
        let rx = store.watch();

        assert!(!rx.has_changed().unwrap());
        store.set_notes_expanded(true).unwrap();
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_unknown_keys_are_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.yaml");
        std::fs::write(&path, "sort_option: deadline\nsome_future_key: 5\n").unwrap();

        let store = PrefStore::open(&path);
        assert_eq!(store.current().sort_option, SortOption::Deadline);
    }
}
