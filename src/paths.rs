//! Default on-disk locations for the database and preference document.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const DB_FILE_NAME: &str = "tasks.db";
pub const PREFS_FILE_NAME: &str = "prefs.yaml";
const APP_DIR: &str = "taskdeck";

/// Default database location under the platform data directory, e.g.
/// `~/.local/share/taskdeck/tasks.db` on Linux.
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(DB_FILE_NAME)
}

/// Default preference document location under the platform config
/// directory, e.g. `~/.config/taskdeck/prefs.yaml` on Linux.
pub fn default_prefs_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(PREFS_FILE_NAME)
}

/// Create the parent directory of `path` if it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    Ok(())
}
