//! CLI command definitions.
//!
//! Defines the surface with clap's derive macros. The structs here stay
//! presentation-only; handlers in `main.rs` translate them into repository
//! and preference calls.

use crate::types::{FilterState, SortOption};
use chrono::{Duration, Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Deadline-first personal task list
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the database file (default: platform data directory)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to the preference file (default: platform config directory)
    #[arg(short, long, global = true)]
    pub prefs: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task
    Add(AddArgs),

    /// Edit a task's fields
    Edit(EditArgs),

    /// List tasks in triage order (default if no subcommand given)
    List(ListArgs),

    /// Show one task in full, subtasks included
    Show(ShowArgs),

    /// Mark a task done
    Done { id: String },

    /// Clear a task's completion
    Undone { id: String },

    /// Delete a task and its subtasks
    Delete { id: String },

    /// Clear an overdue task's deadlines, keeping the task
    Dismiss { id: String },

    /// Move a task's deadline to a new date
    Reschedule { id: String, #[arg(value_parser = parse_date)] date: NaiveDate },

    /// Manage subtasks
    #[command(subcommand)]
    Subtask(SubtaskCommand),

    /// Show or adjust the focus list
    Focus(FocusArgs),

    /// Re-render a live view on every change until Ctrl-C
    Watch(WatchArgs),
}

/// Sort order for task lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Urgency,
    Deadline,
    Created,
}

impl From<SortArg> for SortOption {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Urgency => SortOption::Urgency,
            SortArg::Deadline => SortOption::Deadline,
            SortArg::Created => SortOption::Created,
        }
    }
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task title
    pub title: String,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Soft deadline (YYYY-MM-DD, today, tomorrow)
    #[arg(long, value_parser = parse_date)]
    pub soft: Option<NaiveDate>,

    /// Hard deadline (YYYY-MM-DD, today, tomorrow)
    #[arg(long, value_parser = parse_date)]
    pub hard: Option<NaiveDate>,

    /// Subtask title; repeat the flag to add several
    #[arg(long = "subtask", value_name = "TITLE")]
    pub subtasks: Vec<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Task id (short prefixes accepted)
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// Replace the notes
    #[arg(long, conflicts_with = "clear_notes")]
    pub notes: Option<String>,

    /// Remove the notes
    #[arg(long)]
    pub clear_notes: bool,

    /// New soft deadline (YYYY-MM-DD, today, tomorrow)
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_soft")]
    pub soft: Option<NaiveDate>,

    /// Remove the soft deadline
    #[arg(long)]
    pub clear_soft: bool,

    /// New hard deadline (YYYY-MM-DD, today, tomorrow)
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_hard")]
    pub hard: Option<NaiveDate>,

    /// Remove the hard deadline
    #[arg(long)]
    pub clear_hard: bool,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Sort order; choosing one is sticky across runs
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// Only active (not yet due) tasks
    #[arg(long)]
    pub active: bool,

    /// Only overdue tasks
    #[arg(long)]
    pub overdue: bool,

    /// Only recently completed tasks
    #[arg(long)]
    pub done: bool,

    /// Only tasks whose nearest deadline is soft
    #[arg(long)]
    pub soft: bool,

    /// Only tasks whose nearest deadline is hard
    #[arg(long)]
    pub hard: bool,

    /// Only tasks without any deadline
    #[arg(long)]
    pub no_deadline: bool,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    /// Map the flags onto a filter. No flags means show everything.
    pub fn filter_state(&self) -> FilterState {
        FilterState {
            show_active: self.active,
            show_overdue: self.overdue,
            show_done: self.done,
            show_soft_deadline: self.soft,
            show_hard_deadline: self.hard,
            show_no_deadline: self.no_deadline,
        }
    }
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Task id (short prefixes accepted)
    pub id: String,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum SubtaskCommand {
    /// Append a subtask to a task's list
    Add { task_id: String, title: String },

    /// Toggle a subtask's completion
    Done { subtask_id: String },

    /// Remove a subtask
    Rm { subtask_id: String },

    /// Move a subtask to a new index (0-based) in its list
    Move { subtask_id: String, index: usize },
}

#[derive(Args, Debug)]
pub struct FocusArgs {
    #[command(subcommand)]
    pub command: Option<FocusCommand>,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum FocusCommand {
    /// Pin a task into the focus list
    Pin { id: String },

    /// Release a pinned task
    Unpin { id: String },

    /// Set how many tasks focus shows (clamped to 1-10)
    Limit { n: usize },
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Watch the focus view instead of the task list
    #[arg(long)]
    pub focus: bool,
}

/// Parse a CLI date: `YYYY-MM-DD`, `today`, or `tomorrow`, resolved
/// against the local clock.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    match s {
        "today" => Ok(Local::now().date_naive()),
        "tomorrow" => Ok(Local::now().date_naive() + Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").map_err(|_| {
            format!("invalid date '{other}' (expected YYYY-MM-DD, today, or tomorrow)")
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_date_accepts_iso_and_keywords() {
        assert_eq!(
            parse_date("2025-03-09"),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap())
        );
        assert_eq!(parse_date("today"), Ok(Local::now().date_naive()));
        assert_eq!(
            parse_date("tomorrow"),
            Ok(Local::now().date_naive() + Duration::days(1))
        );
        assert!(parse_date("next week").is_err());
        assert!(parse_date("2025-13-40").is_err());
    }

    #[test]
    fn test_list_flags_build_the_filter() {
        let cli = Cli::parse_from(["taskdeck", "list", "--overdue", "--hard"]);
        let Some(Command::List(args)) = cli.command else {
            panic!("expected list command");
        };
        let filter = args.filter_state();
        assert!(filter.show_overdue);
        assert!(filter.show_hard_deadline);
        assert!(!filter.show_active);
        assert!(!filter.is_default());

        let bare = ListArgs::default().filter_state();
        assert!(bare.is_default());
    }

    #[test]
    fn test_edit_clear_flags_conflict_with_values() {
        let result =
            Cli::try_parse_from(["taskdeck", "edit", "abc", "--soft", "today", "--clear-soft"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_subtask_move_takes_an_index() {
        let cli = Cli::parse_from(["taskdeck", "subtask", "move", "abc", "2"]);
        let Some(Command::Subtask(SubtaskCommand::Move { subtask_id, index })) = cli.command else {
            panic!("expected subtask move");
        };
        assert_eq!(subtask_id, "abc");
        assert_eq!(index, 2);
    }
}
