//! Triage engine: partitions the live task lists into the three view
//! sections, applies the filter flags, and sorts each section.

use crate::deadline::{self, nearest_deadline, start_of_day};
use crate::types::{FilterState, SortOption, Task};
use chrono::{DateTime, TimeZone};
use serde::Serialize;

/// The three mutually exclusive sections of the task list, filtered and
/// sorted, plus the sort that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageView {
    pub overdue: Vec<Task>,
    pub active: Vec<Task>,
    pub done: Vec<Task>,
    pub sort: SortOption,
}

impl TriageView {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.active.is_empty() && self.done.is_empty()
    }
}

/// Build the triage view from the two live lists.
///
/// Active tasks split on the start of the current day: nearest deadline
/// strictly before it means overdue, everything else stays active. Each
/// bucket is filtered and sorted independently.
pub fn triage<Tz: TimeZone>(
    active_tasks: &[Task],
    recently_completed: &[Task],
    filter: &FilterState,
    sort: SortOption,
    now: &DateTime<Tz>,
) -> TriageView {
    let start_of_today = start_of_day(now);
    let (overdue, active): (Vec<Task>, Vec<Task>) = active_tasks
        .iter()
        .cloned()
        .partition(|t| matches!(nearest_deadline(t), Some(d) if d < start_of_today));

    let mut overdue: Vec<Task> = overdue
        .into_iter()
        .filter(|t| matches_filter(t, filter, true))
        .collect();
    let mut active: Vec<Task> = active
        .into_iter()
        .filter(|t| matches_filter(t, filter, false))
        .collect();
    let mut done: Vec<Task> = recently_completed
        .iter()
        .filter(|t| matches_filter(t, filter, false))
        .cloned()
        .collect();

    deadline::sort_tasks(&mut overdue, sort, now);
    deadline::sort_tasks(&mut active, sort, now);
    deadline::sort_tasks(&mut done, sort, now);

    TriageView {
        overdue,
        active,
        done,
        sort,
    }
}

/// Filter predicate: OR within each dimension, AND between the two.
///
/// An empty dimension passes every task, so selecting only status flags does
/// not hide tasks by deadline type and vice versa. `overdue` is the bucket
/// the task landed in, since overdue-ness is not stored on the task.
pub fn matches_filter(task: &Task, filter: &FilterState, overdue: bool) -> bool {
    if filter.is_default() {
        return true;
    }

    let status_match = if !filter.has_status_filter() {
        true
    } else if task.is_completed {
        filter.show_done
    } else if overdue {
        filter.show_overdue
    } else {
        filter.show_active
    };

    let deadline_match = if !filter.has_deadline_filter() {
        true
    } else if !task.has_deadline() {
        filter.show_no_deadline
    } else {
        (task.soft_deadline.is_some() && filter.show_soft_deadline)
            || (task.hard_deadline.is_some() && filter.show_hard_deadline)
    };

    status_match && deadline_match
}
