//! taskdeck library
//!
//! Core engines and storage for the taskdeck CLI, exported for testing and
//! integration.

pub mod cli;
pub mod db;
pub mod deadline;
pub mod editor;
pub mod error;
pub mod focus;
pub mod format;
pub mod live;
pub mod ordering;
pub mod paths;
pub mod prefs;
pub mod repo;
pub mod triage;
pub mod types;
