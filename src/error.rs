//! Typed error for the save-workflow boundary.
//!
//! Everything below this boundary propagates `anyhow::Result`; the editor is
//! the one layer that must distinguish "rejected before touching storage"
//! from "storage failed" so callers can surface the right signal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveError {
    /// Blank title blocks save before any store interaction.
    #[error("title must not be empty")]
    EmptyTitle,

    /// The task to edit no longer exists.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// Storage failed during save; nothing is retried automatically.
    #[error("save failed: {0}")]
    Storage(#[from] anyhow::Error),
}

impl SaveError {
    /// Whether the failure happened before any write was attempted.
    pub fn is_rejection(&self) -> bool {
        matches!(self, SaveError::EmptyTitle | SaveError::TaskNotFound(_))
    }
}
