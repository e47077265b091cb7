//! Text and JSON renderers for the derived views.

use crate::deadline::{self, DeadlineKind};
use crate::focus::FocusView;
use crate::triage::TriageView;
use crate::types::{Subtask, Task, TaskWithSubtasks};
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::collections::HashMap;

/// Serialize any view struct as pretty JSON.
pub fn render_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Deadline badge for list lines, e.g. `[Tomorrow]`. Hard deadlines carry a
/// trailing `!`; a deadline-free task has no badge.
pub fn deadline_badge<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> Option<String> {
    let nearest = deadline::nearest_deadline(task)?;
    let label = deadline::deadline_label(deadline::days_until(nearest, now));
    let marker = match deadline::nearest_deadline_kind(task) {
        Some((_, DeadlineKind::Hard)) => "!",
        _ => "",
    };
    Some(format!("[{}{}]", label, marker))
}

/// Group subtasks by owning task as `(completed, total)` pairs.
pub fn progress_by_task(subtasks: &[Subtask]) -> HashMap<String, (usize, usize)> {
    let mut progress: HashMap<String, (usize, usize)> = HashMap::new();
    for subtask in subtasks {
        let entry = progress.entry(subtask.task_id.clone()).or_default();
        entry.1 += 1;
        if subtask.is_completed {
            entry.0 += 1;
        }
    }
    progress
}

/// One task as a short list line.
fn format_task_line<Tz: TimeZone>(
    task: &Task,
    progress: Option<(usize, usize)>,
    now: &DateTime<Tz>,
) -> String {
    let mut line = String::new();
    line.push_str(if task.is_completed { "- [x] " } else { "- [ ] " });
    line.push_str(&task.title);
    line.push_str(&format!("  `{}`", short_id(&task.id)));
    if let Some(badge) = deadline_badge(task, now) {
        line.push_str(&format!(" {}", badge));
    }
    if let Some((done, total)) = progress
        && total > 0
    {
        line.push_str(&format!(" ({}/{})", done, total));
    }
    line.push('\n');
    line
}

fn short_id(id: &str) -> &str {
    &id[..8.min(id.len())]
}

/// Render a triage view as labeled sections; empty sections are omitted.
pub fn render_triage_text<Tz: TimeZone>(
    view: &TriageView,
    progress: &HashMap<String, (usize, usize)>,
    now: &DateTime<Tz>,
) -> String {
    let mut out = String::new();
    let sections = [
        ("Overdue", &view.overdue),
        ("Active", &view.active),
        ("Done", &view.done),
    ];
    for (heading, tasks) in sections {
        if tasks.is_empty() {
            continue;
        }
        out.push_str(&format!("## {} ({})\n", heading, tasks.len()));
        for task in tasks {
            out.push_str(&format_task_line(
                task,
                progress.get(&task.id).copied(),
                now,
            ));
        }
        out.push('\n');
    }
    if view.is_empty() {
        out.push_str("No tasks.\n");
    }
    out
}

/// Render the focus view. Pinned tasks carry a `*` marker.
pub fn render_focus_text<Tz: TimeZone>(view: &FocusView, now: &DateTime<Tz>) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Focus ({}/{})\n", view.tasks.len(), view.limit));
    for task in &view.tasks {
        let pin = if view.pinned_ids.contains(&task.id) {
            "* "
        } else {
            "  "
        };
        out.push_str(&format!("{}{}  `{}`", pin, task.title, short_id(&task.id)));
        if let Some(badge) = deadline_badge(task, now) {
            out.push_str(&format!(" {}", badge));
        }
        out.push('\n');
    }
    if view.tasks.is_empty() {
        out.push_str("Nothing to focus on.\n");
    }
    out
}

/// Render one task with full detail.
pub fn render_task_detail<Tz: TimeZone>(entry: &TaskWithSubtasks, now: &DateTime<Tz>) -> String {
    let task = &entry.task;
    let tz = now.timezone();
    let mut md = String::new();

    md.push_str(&format!("## {}\n", task.title));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!(
        "- **status**: {}\n",
        if task.is_completed { "done" } else { "active" }
    ));
    if let Some(soft) = task.soft_deadline {
        md.push_str(&format!(
            "- **soft deadline**: {} ({})\n",
            soft.with_timezone(&tz).date_naive(),
            deadline::deadline_label(deadline::days_until(soft, now)),
        ));
    }
    if let Some(hard) = task.hard_deadline {
        md.push_str(&format!(
            "- **hard deadline**: {} ({})\n",
            hard.with_timezone(&tz).date_naive(),
            deadline::deadline_label(deadline::days_until(hard, now)),
        ));
    }
    md.push_str(&format!(
        "- **created**: {}\n",
        task.created_at.with_timezone(&tz).date_naive()
    ));

    if let Some(ref notes) = task.description {
        md.push_str("\n### Notes\n");
        md.push_str(notes);
        md.push('\n');
    }

    if entry.has_subtasks() {
        md.push_str(&format!(
            "\n### Subtasks ({}/{})\n",
            entry.completed_subtask_count(),
            entry.total_subtask_count(),
        ));
        for subtask in &entry.subtasks {
            md.push_str(&format!(
                "- [{}] {}  `{}`\n",
                if subtask.is_completed { "x" } else { " " },
                subtask.title,
                short_id(&subtask.id),
            ));
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FilterState, SortOption};
    use chrono::{Duration, Utc};

    fn task_due_in(days: i64, hard: bool) -> Task {
        let deadline = Some(Utc::now() + Duration::days(days));
        let mut task = Task::new("t");
        if hard {
            task.hard_deadline = deadline;
        } else {
            task.soft_deadline = deadline;
        }
        task
    }

    #[test]
    fn test_badge_marks_hard_deadlines() {
        let now = Utc::now();
        assert_eq!(
            deadline_badge(&task_due_in(1, false), &now),
            Some("[Tomorrow]".to_string())
        );
        assert_eq!(
            deadline_badge(&task_due_in(1, true), &now),
            Some("[Tomorrow!]".to_string())
        );
        assert_eq!(deadline_badge(&Task::new("t"), &now), None);
    }

    #[test]
    fn test_progress_by_task_counts_completion() {
        let task = Task::new("t");
        let mut first = Subtask::new(&task.id, "a");
        first.is_completed = true;
        let second = Subtask::new(&task.id, "b");
        let other = Subtask::new("other-task", "c");

        let progress = progress_by_task(&[first, second, other]);
        assert_eq!(progress.get(&task.id), Some(&(1, 2)));
        assert_eq!(progress.get("other-task"), Some(&(0, 1)));
    }

    #[test]
    fn test_triage_text_omits_empty_sections() {
        let now = Utc::now();
        let view = crate::triage::triage(
            &[Task::new("only active")],
            &[],
            &FilterState::default(),
            SortOption::Urgency,
            &now,
        );
        let text = render_triage_text(&view, &HashMap::new(), &now);
        assert!(text.contains("## Active (1)"));
        assert!(!text.contains("Overdue"));
        assert!(!text.contains("Done"));
        assert!(text.contains("- [ ] only active"));
    }

    #[test]
    fn test_triage_text_empty_view() {
        let now = Utc::now();
        let view = crate::triage::triage(
            &[],
            &[],
            &FilterState::default(),
            SortOption::Urgency,
            &now,
        );
        assert_eq!(render_triage_text(&view, &HashMap::new(), &now), "No tasks.\n");
    }

    #[test]
    fn test_task_line_includes_progress() {
        let now = Utc::now();
        let task = Task::new("with subtasks");
        let line = format_task_line(&task, Some((2, 5)), &now);
        assert!(line.contains("(2/5)"));
        let bare = format_task_line(&task, None, &now);
        assert!(!bare.contains("(0/"));
    }

    #[test]
    fn test_focus_text_marks_pins() {
        let now = Utc::now();
        let pinned = Task::new("pinned");
        let other = Task::new("other");
        let view = FocusView {
            pinned_ids: vec![pinned.id.clone()],
            tasks: vec![pinned, other],
            limit: 5,
        };
        let text = render_focus_text(&view, &now);
        assert!(text.starts_with("# Focus (2/5)\n"));
        assert!(text.contains("* pinned"));
        assert!(text.contains("  other"));
    }

    #[test]
    fn test_detail_sections_appear_only_when_present() {
        let now = Utc::now();
        let mut task = Task::new("detail");
        task.description = Some("remember the thing".to_string());
        let mut subtask = Subtask::new(&task.id, "step one");
        subtask.is_completed = true;
        let entry = TaskWithSubtasks {
            task,
            subtasks: vec![subtask],
        };

        let text = render_task_detail(&entry, &now);
        assert!(text.contains("### Notes\nremember the thing"));
        assert!(text.contains("### Subtasks (1/1)"));
        assert!(text.contains("- [x] step one"));

        let bare = TaskWithSubtasks {
            task: Task::new("bare"),
            subtasks: vec![],
        };
        let text = render_task_detail(&bare, &now);
        assert!(!text.contains("### Notes"));
        assert!(!text.contains("### Subtasks"));
    }
}
