//! Core types for the taskdeck engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task kind tag. Only one kind exists today; the column is reserved for
/// future task kinds (recurring etc.).
pub const TASK_TYPE_ONE_TIME: &str = "one_time";

/// A task with optional soft/hard deadlines.
///
/// The two deadlines are independent: both, either, or neither may be set,
/// and no ordering between them is enforced. "Soft" is a reminder-level
/// target; "hard" is a due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub soft_deadline: Option<DateTime<Utc>>,
    pub hard_deadline: Option<DateTime<Utc>>,
    pub is_completed: bool,
    /// Set exactly when `is_completed` flips true, cleared when it flips false.
    pub completed_at: Option<DateTime<Utc>>,
    /// Reserved for hiding long-completed tasks; nothing consumes it yet.
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub task_type: String,
}

impl Task {
    /// Build a fresh task with generated id and creation time.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            title: title.into(),
            description: None,
            soft_deadline: None,
            hard_deadline: None,
            is_completed: false,
            completed_at: None,
            archived_at: None,
            created_at: Utc::now(),
            task_type: TASK_TYPE_ONE_TIME.to_string(),
        }
    }

    pub fn has_deadline(&self) -> bool {
        self.soft_deadline.is_some() || self.hard_deadline.is_some()
    }
}

/// A subtask owned by a task. Deleting the task deletes its subtasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub task_id: String,
    pub title: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// Float sort key among siblings, maintained by fractional indexing.
    pub position: f64,
    pub created_at: DateTime<Utc>,
}

impl Subtask {
    /// New incomplete subtask at position 0; the store assigns the real
    /// end-of-list position on insert.
    pub fn new(task_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            task_id: task_id.into(),
            title: title.into(),
            is_completed: false,
            completed_at: None,
            position: 0.0,
            created_at: Utc::now(),
        }
    }
}

/// A task joined with its ordered subtask list (read-side composition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskWithSubtasks {
    #[serde(flatten)]
    pub task: Task,
    pub subtasks: Vec<Subtask>,
}

impl TaskWithSubtasks {
    pub fn total_subtask_count(&self) -> usize {
        self.subtasks.len()
    }

    pub fn completed_subtask_count(&self) -> usize {
        self.subtasks.iter().filter(|s| s.is_completed).count()
    }

    pub fn has_subtasks(&self) -> bool {
        !self.subtasks.is_empty()
    }
}

/// Sort order for task lists. Persisted by name in preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    /// Overdue-by-now first, then ascending nearest deadline.
    #[default]
    Urgency,
    /// Ascending nearest deadline only.
    Deadline,
    /// Newest created first.
    Created,
}

impl SortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Urgency => "urgency",
            SortOption::Deadline => "deadline",
            SortOption::Created => "created",
        }
    }

    /// Parse a sort option name. Unrecognized values fall back to urgency.
    pub fn parse(s: &str) -> SortOption {
        match s.to_lowercase().as_str() {
            "deadline" => SortOption::Deadline,
            "created" => SortOption::Created,
            _ => SortOption::Urgency,
        }
    }
}

impl std::fmt::Display for SortOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Six independent filter flags: three status, three deadline-type.
///
/// All-false is the default and means "no filtering, show everything".
/// Within each dimension the selected flags are OR'd; between the two
/// dimensions the results are AND'd. An empty dimension passes every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterState {
    pub show_active: bool,
    pub show_overdue: bool,
    pub show_done: bool,
    pub show_soft_deadline: bool,
    pub show_hard_deadline: bool,
    pub show_no_deadline: bool,
}

impl FilterState {
    /// True when no flag is set, i.e. nothing is filtered out.
    pub fn is_default(&self) -> bool {
        !self.show_active
            && !self.show_overdue
            && !self.show_done
            && !self.show_soft_deadline
            && !self.show_hard_deadline
            && !self.show_no_deadline
    }

    pub fn has_status_filter(&self) -> bool {
        self.show_active || self.show_overdue || self.show_done
    }

    pub fn has_deadline_filter(&self) -> bool {
        self.show_soft_deadline || self.show_hard_deadline || self.show_no_deadline
    }

    /// Number of selected flags, for display ("3 filters active").
    pub fn active_filter_count(&self) -> usize {
        [
            self.show_active,
            self.show_overdue,
            self.show_done,
            self.show_soft_deadline,
            self.show_hard_deadline,
            self.show_no_deadline,
        ]
        .iter()
        .filter(|&&f| f)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_state_is_default() {
        let filter = FilterState::default();
        assert!(filter.is_default());
        assert!(!filter.has_status_filter());
        assert!(!filter.has_deadline_filter());
        assert_eq!(filter.active_filter_count(), 0);
    }

    #[test]
    fn test_filter_state_dimension_checks() {
        let filter = FilterState {
            show_overdue: true,
            show_no_deadline: true,
            ..Default::default()
        };
        assert!(!filter.is_default());
        assert!(filter.has_status_filter());
        assert!(filter.has_deadline_filter());
        assert_eq!(filter.active_filter_count(), 2);
    }

    #[test]
    fn test_sort_option_parse_round_trip() {
        for opt in [SortOption::Urgency, SortOption::Deadline, SortOption::Created] {
            assert_eq!(SortOption::parse(opt.as_str()), opt);
        }
        assert_eq!(SortOption::parse("nonsense"), SortOption::Urgency);
    }

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new("write report");
        assert!(!task.is_completed);
        assert!(task.completed_at.is_none());
        assert!(!task.has_deadline());
        assert_eq!(task.task_type, TASK_TYPE_ONE_TIME);
        assert!(!task.id.is_empty());
    }

    #[test]
    fn test_task_with_subtasks_counts() {
        let task = Task::new("pack for trip");
        let mk = |title: &str, done: bool| Subtask {
            id: uuid::Uuid::now_v7().to_string(),
            task_id: task.id.clone(),
            title: title.to_string(),
            is_completed: done,
            completed_at: done.then(Utc::now),
            position: 0.0,
            created_at: Utc::now(),
        };
        let joined = TaskWithSubtasks {
            task: task.clone(),
            subtasks: vec![mk("passport", true), mk("charger", false)],
        };
        assert_eq!(joined.total_subtask_count(), 2);
        assert_eq!(joined.completed_subtask_count(), 1);
        assert!(joined.has_subtasks());
    }
}
