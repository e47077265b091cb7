//! Focus selection: a bounded, pin-aware subset of the active tasks.

use crate::deadline;
use crate::types::{SortOption, Task};
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::collections::BTreeSet;

pub const FOCUS_LIMIT_MIN: usize = 1;
pub const FOCUS_LIMIT_MAX: usize = 10;
pub const FOCUS_LIMIT_DEFAULT: usize = 5;

/// Clamp a requested focus limit into the supported range.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(FOCUS_LIMIT_MIN, FOCUS_LIMIT_MAX)
}

/// The focus set plus what produced it, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusView {
    pub tasks: Vec<Task>,
    /// Ids in `tasks` that are there because the user pinned them.
    pub pinned_ids: Vec<String>,
    pub limit: usize,
}

/// Select the focus set from the active tasks.
///
/// Pinned tasks come first, in the active list's incoming order; remaining
/// slots are auto-filled with the most urgent unpinned tasks. Pins whose
/// task completed or disappeared simply contribute nothing. If pins alone
/// reach the limit the selection is pins only, truncated to the limit.
pub fn select_focus_tasks<Tz: TimeZone>(
    active_tasks: &[Task],
    limit: usize,
    pinned_ids: &BTreeSet<String>,
    now: &DateTime<Tz>,
) -> Vec<Task> {
    let limit = clamp_limit(limit);
    let pinned: Vec<Task> = active_tasks
        .iter()
        .filter(|t| pinned_ids.contains(&t.id))
        .cloned()
        .collect();
    let remaining = limit.saturating_sub(pinned.len());

    let mut unpinned: Vec<Task> = active_tasks
        .iter()
        .filter(|t| !pinned_ids.contains(&t.id))
        .cloned()
        .collect();
    deadline::sort_tasks(&mut unpinned, SortOption::Urgency, now);

    let mut selected = pinned;
    selected.extend(unpinned.into_iter().take(remaining));
    selected.truncate(limit);
    selected
}

/// Assemble the renderable view for the focus screen.
pub fn focus_view<Tz: TimeZone>(
    active_tasks: &[Task],
    limit: usize,
    pinned_ids: &BTreeSet<String>,
    now: &DateTime<Tz>,
) -> FocusView {
    let tasks = select_focus_tasks(active_tasks, limit, pinned_ids, now);
    let pinned = tasks
        .iter()
        .filter(|t| pinned_ids.contains(&t.id))
        .map(|t| t.id.clone())
        .collect();
    FocusView {
        tasks,
        pinned_ids: pinned,
        limit: clamp_limit(limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn utc(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 12, 0, 0).unwrap()
    }

    fn task(title: &str, hard: Option<DateTime<Utc>>) -> Task {
        let mut t = Task::new(title);
        t.hard_deadline = hard;
        t
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    fn pins(names: &[&Task]) -> BTreeSet<String> {
        names.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_pins_precede_urgency_fill() {
        let now = utc(2025, 3, 10);
        let urgent = task("urgent", Some(utc(2025, 3, 11)));
        let relaxed = task("relaxed", Some(utc(2025, 4, 1)));
        let pinned = task("pinned", None);
        let active = vec![urgent.clone(), relaxed.clone(), pinned.clone()];

        let selected = select_focus_tasks(&active, 2, &pins(&[&pinned]), &now);

        assert_eq!(ids(&selected), vec!["pinned", "urgent"]);
    }

    #[test]
    fn test_pins_keep_incoming_order_not_urgency() {
        let now = utc(2025, 3, 10);
        let a = task("a dateless", None);
        let b = task("b urgent", Some(utc(2025, 3, 11)));
        let active = vec![a.clone(), b.clone()];

        let selected = select_focus_tasks(&active, 5, &pins(&[&a, &b]), &now);

        // Both pinned: incoming order wins even though b is more urgent.
        assert_eq!(ids(&selected), vec!["a dateless", "b urgent"]);
    }

    #[test]
    fn test_pins_at_limit_leave_no_room_for_fill() {
        let now = utc(2025, 3, 10);
        let p1 = task("p1", None);
        let p2 = task("p2", None);
        let urgent = task("urgent", Some(utc(2025, 3, 11)));
        let active = vec![p1.clone(), p2.clone(), urgent.clone()];

        let selected = select_focus_tasks(&active, 2, &pins(&[&p1, &p2]), &now);

        assert_eq!(selected.len(), 2);
        assert_eq!(ids(&selected), vec!["p1", "p2"]);
    }

    #[test]
    fn test_pins_beyond_limit_truncate() {
        let now = utc(2025, 3, 10);
        let tasks: Vec<Task> = (0..4).map(|i| task(&format!("p{i}"), None)).collect();
        let all_pinned: BTreeSet<String> = tasks.iter().map(|t| t.id.clone()).collect();

        let selected = select_focus_tasks(&tasks, 3, &all_pinned, &now);

        assert_eq!(ids(&selected), vec!["p0", "p1", "p2"]);
    }

    #[test]
    fn test_stale_pins_contribute_nothing() {
        let now = utc(2025, 3, 10);
        let only = task("only", None);
        let mut stale_pins = BTreeSet::new();
        stale_pins.insert("completed-long-ago".to_string());

        let selected = select_focus_tasks(&[only.clone()], 5, &stale_pins, &now);

        assert_eq!(ids(&selected), vec!["only"]);
    }

    #[test]
    fn test_fewer_active_than_limit_returns_all() {
        let now = utc(2025, 3, 10);
        let a = task("a", None);
        let selected = select_focus_tasks(&[a], 5, &BTreeSet::new(), &now);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_limit_clamps_to_range() {
        assert_eq!(clamp_limit(0), FOCUS_LIMIT_MIN);
        assert_eq!(clamp_limit(99), FOCUS_LIMIT_MAX);
        assert_eq!(clamp_limit(7), 7);

        let now = utc(2025, 3, 10);
        let tasks: Vec<Task> = (0..3).map(|i| task(&format!("t{i}"), None)).collect();
        let selected = select_focus_tasks(&tasks, 0, &BTreeSet::new(), &now);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_focus_view_reports_pinned_subset() {
        let now = utc(2025, 3, 10);
        let pinned = task("pinned", None);
        let other = task("other", None);
        let active = vec![other.clone(), pinned.clone()];

        let view = focus_view(&active, 5, &pins(&[&pinned]), &now);

        assert_eq!(view.limit, 5);
        assert_eq!(view.pinned_ids, vec![pinned.id.clone()]);
        assert_eq!(view.tasks.len(), 2);
    }
}
