//! Task repository: mutation entry points and live derived views.
//!
//! Mutations write through the store synchronously and silently tolerate
//! stale ids, so a caller racing a concurrent delete never fails. Live views
//! are spawned combinators over the store's revision channels; each one
//! recomputes its full snapshot from a fresh read.

use crate::db::Store;
use crate::deadline::local_midnight;
use crate::live::{LiveQuery, spawn_live};
use crate::ordering::{ReorderPlan, plan_move};
use crate::types::{Subtask, Task, TaskWithSubtasks};
use anyhow::Result;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use tracing::debug;

/// How long a completed task stays visible in the done section.
pub const RECENT_COMPLETION_WINDOW_HOURS: i64 = 24;

#[derive(Clone)]
pub struct TaskRepository {
    store: Store,
}

impl TaskRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ---- task reads ----

    /// Point lookup; absent ids are `None`.
    pub fn get_by_id(&self, id: &str) -> Result<Option<Task>> {
        self.store.get_task(id)
    }

    /// Incomplete tasks in store order: overdue, then by nearest deadline,
    /// dateless last.
    pub fn active_tasks(&self) -> Result<Vec<Task>> {
        self.store.active_tasks(Utc::now())
    }

    /// Tasks completed inside the visibility window, newest first. Anything
    /// older silently disappears from every view.
    pub fn recently_completed(&self) -> Result<Vec<Task>> {
        let cutoff = Utc::now() - Duration::hours(RECENT_COMPLETION_WINDOW_HOURS);
        self.store.completed_since(cutoff)
    }

    /// One task joined with its ordered subtasks.
    pub fn task_with_subtasks(&self, id: &str) -> Result<Option<TaskWithSubtasks>> {
        let Some(task) = self.store.get_task(id)? else {
            return Ok(None);
        };
        let subtasks = self.store.subtasks_for_task(id)?;
        Ok(Some(TaskWithSubtasks { task, subtasks }))
    }

    // ---- task mutations ----

    /// Full-entity upsert; replaces on id collision.
    pub fn insert(&self, task: &Task) -> Result<()> {
        self.store.insert_task(task)
    }

    /// Full-entity update (same replace semantics as insert).
    pub fn update(&self, task: &Task) -> Result<()> {
        self.store.update_task(task)
    }

    /// Mark completed now. No-op for a stale id.
    pub fn complete_task(&self, id: &str) -> Result<()> {
        if !self.store.complete_task(id, Utc::now())? {
            debug!(task_id = id, "complete_task: no such task");
        }
        Ok(())
    }

    /// Clear completion, restoring the task to active.
    pub fn uncomplete_task(&self, id: &str) -> Result<()> {
        if !self.store.uncomplete_task(id)? {
            debug!(task_id = id, "uncomplete_task: no such task");
        }
        Ok(())
    }

    /// Clear both deadlines, leaving the task dateless.
    pub fn dismiss_overdue(&self, id: &str) -> Result<()> {
        if !self.store.clear_deadlines(id)? {
            debug!(task_id = id, "dismiss_overdue: no such task");
        }
        Ok(())
    }

    /// Move the task's reminder to midnight of `new_date`: the soft deadline
    /// if one is set, else the hard deadline. A task with neither keeps
    /// nothing to reschedule and the call is a no-op.
    pub fn reschedule_task<Tz: TimeZone>(
        &self,
        id: &str,
        new_date: NaiveDate,
        tz: &Tz,
    ) -> Result<()> {
        let Some(task) = self.store.get_task(id)? else {
            debug!(task_id = id, "reschedule_task: no such task");
            return Ok(());
        };
        let midnight = local_midnight(new_date, tz);
        let updated = if task.soft_deadline.is_some() {
            Task {
                soft_deadline: Some(midnight),
                ..task
            }
        } else if task.hard_deadline.is_some() {
            Task {
                hard_deadline: Some(midnight),
                ..task
            }
        } else {
            return Ok(());
        };
        self.store.update_task(&updated)
    }

    /// Delete the task; its subtasks cascade away with it.
    pub fn delete_task(&self, id: &str) -> Result<()> {
        if !self.store.delete_task(id)? {
            debug!(task_id = id, "delete_task: no such task");
        }
        Ok(())
    }

    // ---- subtask operations ----

    /// Ordered subtasks of one task.
    pub fn subtasks(&self, task_id: &str) -> Result<Vec<Subtask>> {
        self.store.subtasks_for_task(task_id)
    }

    /// Append a subtask after the current last sibling.
    pub fn add_subtask(&self, task_id: &str, title: &str) -> Result<Subtask> {
        self.store.add_subtask(task_id, title)
    }

    /// Flip completion, stamping or clearing the completion instant.
    pub fn toggle_subtask(&self, id: &str) -> Result<()> {
        let Some(subtask) = self.store.get_subtask(id)? else {
            debug!(subtask_id = id, "toggle_subtask: no such subtask");
            return Ok(());
        };
        let completed_at = if subtask.is_completed {
            None
        } else {
            Some(Utc::now())
        };
        self.store.set_subtask_completion(id, completed_at)?;
        Ok(())
    }

    pub fn delete_subtask(&self, id: &str) -> Result<()> {
        if !self.store.delete_subtask(id)? {
            debug!(subtask_id = id, "delete_subtask: no such subtask");
        }
        Ok(())
    }

    /// Move a subtask to `target_index` within `ordered`, the sibling list
    /// the caller is looking at. Out-of-range targets and stale ids are
    /// silent no-ops; a renumber rewrites the whole sibling list atomically.
    pub fn reorder_subtask(
        &self,
        subtask_id: &str,
        target_index: usize,
        ordered: &[Subtask],
    ) -> Result<()> {
        match plan_move(ordered, subtask_id, target_index) {
            ReorderPlan::Unchanged => Ok(()),
            ReorderPlan::Move { position } => {
                self.store.update_subtask_position(subtask_id, position)?;
                Ok(())
            }
            ReorderPlan::Renumber { positions } => {
                debug!(
                    subtask_id,
                    siblings = positions.len(),
                    "position precision exhausted, renumbering"
                );
                self.store.renumber_subtasks(&positions)
            }
        }
    }

    // ---- live views ----

    /// Live active-task list (store ordering).
    pub fn observe_active_tasks(&self) -> LiveQuery<Vec<Task>> {
        let store = self.store.clone();
        spawn_live(vec![self.store.watch_tasks()], move || {
            store.active_tasks(Utc::now())
        })
    }

    /// Live recently-completed list.
    pub fn observe_recently_completed(&self) -> LiveQuery<Vec<Task>> {
        let store = self.store.clone();
        spawn_live(vec![self.store.watch_tasks()], move || {
            let cutoff = Utc::now() - Duration::hours(RECENT_COMPLETION_WINDOW_HOURS);
            store.completed_since(cutoff)
        })
    }

    /// Live ordered subtask list for one task.
    pub fn observe_subtasks(&self, task_id: &str) -> LiveQuery<Vec<Subtask>> {
        let store = self.store.clone();
        let task_id = task_id.to_string();
        spawn_live(vec![self.store.watch_subtasks()], move || {
            store.subtasks_for_task(&task_id)
        })
    }

    /// Live active tasks joined with their subtasks. Either table changing
    /// rebuilds the whole joined snapshot.
    pub fn observe_active_with_subtasks(&self) -> LiveQuery<Vec<TaskWithSubtasks>> {
        let store = self.store.clone();
        spawn_live(
            vec![self.store.watch_tasks(), self.store.watch_subtasks()],
            move || {
                let tasks = store.active_tasks(Utc::now())?;
                join_subtasks(&store, tasks)
            },
        )
    }

    /// Live recently-completed tasks joined with their subtasks.
    pub fn observe_recently_completed_with_subtasks(&self) -> LiveQuery<Vec<TaskWithSubtasks>> {
        let store = self.store.clone();
        spawn_live(
            vec![self.store.watch_tasks(), self.store.watch_subtasks()],
            move || {
                let cutoff = Utc::now() - Duration::hours(RECENT_COMPLETION_WINDOW_HOURS);
                let tasks = store.completed_since(cutoff)?;
                join_subtasks(&store, tasks)
            },
        )
    }
}

/// Join tasks with their subtasks using one subtask scan.
fn join_subtasks(store: &Store, tasks: Vec<Task>) -> Result<Vec<TaskWithSubtasks>> {
    let mut grouped: HashMap<String, Vec<Subtask>> = HashMap::new();
    for subtask in store.all_subtasks_ordered()? {
        grouped
            .entry(subtask.task_id.clone())
            .or_default()
            .push(subtask);
    }
    Ok(tasks
        .into_iter()
        .map(|task| {
            let subtasks = grouped.remove(&task.id).unwrap_or_default();
            TaskWithSubtasks { task, subtasks }
        })
        .collect())
}
