//! Deadline and urgency model.
//!
//! Pure functions over tasks and a reference "now". Overdue status is
//! computed against the start of the current local day, so a deadline earlier
//! today does not count as overdue until the next calendar day begins. All
//! day-boundary functions are generic over the time zone; production passes
//! `Local`, tests pin a fixed offset.

use crate::types::{SortOption, Task};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Days past the nearest deadline before a task counts as long-overdue.
pub const LONG_OVERDUE_DAYS: i64 = 7;

/// Which deadline field produced the nearest deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineKind {
    Soft,
    Hard,
}

/// The earlier of the two deadlines, ignoring unset fields.
pub fn nearest_deadline(task: &Task) -> Option<DateTime<Utc>> {
    match (task.soft_deadline, task.hard_deadline) {
        (Some(soft), Some(hard)) => Some(soft.min(hard)),
        (Some(soft), None) => Some(soft),
        (None, Some(hard)) => Some(hard),
        (None, None) => None,
    }
}

/// Nearest deadline plus which field it came from.
///
/// When both fields hold the exact same instant the hard label wins; a due
/// date outranks a reminder.
pub fn nearest_deadline_kind(task: &Task) -> Option<(DateTime<Utc>, DeadlineKind)> {
    let nearest = nearest_deadline(task)?;
    let kind = if task.hard_deadline == Some(nearest) {
        DeadlineKind::Hard
    } else {
        DeadlineKind::Soft
    };
    Some((nearest, kind))
}

/// Start of the current calendar day in `now`'s zone, as a UTC instant.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // A DST gap exactly at midnight has no local midnight; fall back to
        // the instant itself.
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

/// Midnight of the given calendar date in the given zone, as a UTC instant.
/// Date-granularity deadlines persist at this instant.
pub fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // DST gap at midnight; treat the naive time as UTC rather than fail.
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Whether the nearest deadline lies before the start of the current day.
pub fn is_overdue<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> bool {
    match nearest_deadline(task) {
        Some(deadline) => deadline < start_of_day(now),
        None => false,
    }
}

/// Overdue and at least [`LONG_OVERDUE_DAYS`] behind "now" (instant-based
/// duration, not calendar days).
pub fn is_long_overdue<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> bool {
    match nearest_deadline(task) {
        Some(deadline) => {
            is_overdue(task, now)
                && now.with_timezone(&Utc) - deadline >= Duration::days(LONG_OVERDUE_DAYS)
        }
        None => false,
    }
}

/// Calendar-day difference between a deadline and today in `now`'s zone.
/// Positive means future, zero today, negative past. This is date
/// subtraction, not millisecond division, so 23:59 tonight is still 0.
pub fn days_until<Tz: TimeZone>(deadline: DateTime<Utc>, now: &DateTime<Tz>) -> i64 {
    let deadline_date = deadline.with_timezone(&now.timezone()).date_naive();
    let today = now.date_naive();
    deadline_date.signed_duration_since(today).num_days()
}

/// Badge text for a day difference from [`days_until`].
pub fn deadline_label(days: i64) -> String {
    match days {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        d if d > 1 => format!("In {d} days"),
        d => format!("{} days ago", -d),
    }
}

/// Urgency sort key: tasks already past "now" first (instant comparison,
/// unlike the start-of-day partition), then ascending nearest deadline.
/// Dateless tasks carry a maximal sentinel and sort last.
fn urgency_key(task: &Task, now_utc: DateTime<Utc>) -> (u8, i64) {
    let nearest = nearest_deadline(task);
    let past_now = matches!(nearest, Some(d) if d < now_utc);
    let deadline_ms = nearest.map_or(i64::MAX, |d| d.timestamp_millis());
    (if past_now { 0 } else { 1 }, deadline_ms)
}

fn deadline_key(task: &Task) -> i64 {
    nearest_deadline(task).map_or(i64::MAX, |d| d.timestamp_millis())
}

/// Sort tasks in place by the given option. The sort is stable, so ties keep
/// their incoming order.
pub fn sort_tasks<Tz: TimeZone>(tasks: &mut [Task], sort: SortOption, now: &DateTime<Tz>) {
    let now_utc = now.with_timezone(&Utc);
    match sort {
        SortOption::Urgency => tasks.sort_by_key(|t| urgency_key(t, now_utc)),
        SortOption::Deadline => tasks.sort_by_key(deadline_key),
        SortOption::Created => tasks.sort_by_key(|t| std::cmp::Reverse(t.created_at)),
    }
}
