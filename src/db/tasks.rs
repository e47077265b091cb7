//! Task table operations.

use super::{Store, from_ms};
use crate::types::Task;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use uuid::Uuid;

/// Nearest-deadline expression: scalar MIN returns NULL when either argument
/// is NULL, so COALESCE falls through to whichever field is set.
pub(crate) const NEAREST_DEADLINE_SQL: &str =
    "COALESCE(MIN(soft_deadline, hard_deadline), soft_deadline, hard_deadline)";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let soft_deadline: Option<i64> = row.get("soft_deadline")?;
    let hard_deadline: Option<i64> = row.get("hard_deadline")?;
    let completed_at: Option<i64> = row.get("completed_at")?;
    let archived_at: Option<i64> = row.get("archived_at")?;
    let created_at: i64 = row.get("created_at")?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        soft_deadline: soft_deadline.map(from_ms),
        hard_deadline: hard_deadline.map(from_ms),
        is_completed: row.get("is_completed")?,
        completed_at: completed_at.map(from_ms),
        archived_at: archived_at.map(from_ms),
        created_at: from_ms(created_at),
        task_type: row.get("task_type")?,
    })
}

impl Store {
    /// Upsert a full task entity. An existing row with the same id is
    /// replaced, so re-inserting is idempotent rather than an error.
    pub fn insert_task(&self, task: &Task) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO tasks
                 (id, title, description, soft_deadline, hard_deadline,
                  is_completed, completed_at, archived_at, created_at, task_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    task.id,
                    task.title,
                    task.description,
                    task.soft_deadline.map(|d| d.timestamp_millis()),
                    task.hard_deadline.map(|d| d.timestamp_millis()),
                    task.is_completed,
                    task.completed_at.map(|d| d.timestamp_millis()),
                    task.archived_at.map(|d| d.timestamp_millis()),
                    task.created_at.timestamp_millis(),
                    task.task_type,
                ],
            )?;
            Ok(())
        })?;
        self.notify_tasks_changed();
        Ok(())
    }

    /// Full-entity update. Same write as [`Store::insert_task`]; the split
    /// exists so call sites read as intent.
    pub fn update_task(&self, task: &Task) -> Result<()> {
        self.insert_task(task)
    }

    /// Point lookup. Absent ids are `None`, never an error.
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            match conn.query_row(
                "SELECT * FROM tasks WHERE id = ?1",
                params![id],
                parse_task_row,
            ) {
                Ok(task) => Ok(Some(task)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Ids starting with `prefix`, for short-id resolution at the surface.
    pub fn find_task_ids_by_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM tasks WHERE id LIKE ?1 ORDER BY id")?;
            let ids = stmt
                .query_map(params![format!("{prefix}%")], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(ids)
        })
    }

    /// Incomplete tasks ordered overdue-first (nearest deadline before
    /// `now`), then ascending nearest deadline, then dateless tasks last.
    /// Dateless ties carry no secondary key.
    pub fn active_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT * FROM tasks WHERE is_completed = 0
             ORDER BY
               CASE
                 WHEN {nearest} IS NULL THEN 2
                 WHEN {nearest} < ?1 THEN 0
                 ELSE 1
               END,
               {nearest} ASC",
            nearest = NEAREST_DEADLINE_SQL
        );
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(params![now.timestamp_millis()], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Completed tasks with `completed_at` after the cutoff, newest first.
    pub fn completed_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks
                 WHERE is_completed = 1 AND completed_at > ?1
                 ORDER BY completed_at DESC",
            )?;
            let tasks = stmt
                .query_map(params![cutoff.timestamp_millis()], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Mark a task completed at the given instant. Returns false (and writes
    /// nothing) if the id is absent.
    pub fn complete_task(&self, id: &str, completed_at: DateTime<Utc>) -> Result<bool> {
        let updated = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE tasks SET is_completed = 1, completed_at = ?2 WHERE id = ?1",
                params![id, completed_at.timestamp_millis()],
            )?)
        })?;
        if updated > 0 {
            self.notify_tasks_changed();
        }
        Ok(updated > 0)
    }

    /// Clear completion, restoring `completed_at` to NULL.
    pub fn uncomplete_task(&self, id: &str) -> Result<bool> {
        let updated = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE tasks SET is_completed = 0, completed_at = NULL WHERE id = ?1",
                params![id],
            )?)
        })?;
        if updated > 0 {
            self.notify_tasks_changed();
        }
        Ok(updated > 0)
    }

    /// Drop both deadlines, leaving the task dateless.
    pub fn clear_deadlines(&self, id: &str) -> Result<bool> {
        let updated = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE tasks SET soft_deadline = NULL, hard_deadline = NULL WHERE id = ?1",
                params![id],
            )?)
        })?;
        if updated > 0 {
            self.notify_tasks_changed();
        }
        Ok(updated > 0)
    }

    /// Delete a task; subtasks go with it via ON DELETE CASCADE.
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let deleted = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?)
        })?;
        if deleted > 0 {
            self.notify_tasks_changed();
            self.notify_subtasks_changed();
        }
        Ok(deleted > 0)
    }

    /// Upsert a task and append buffered subtask titles in entry order, all
    /// in one transaction so a failed subtask insert cannot leave a
    /// half-saved task behind.
    pub fn save_task_with_subtasks(&self, task: &Task, subtask_titles: &[String]) -> Result<()> {
        let created_at = Utc::now();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT OR REPLACE INTO tasks
                 (id, title, description, soft_deadline, hard_deadline,
                  is_completed, completed_at, archived_at, created_at, task_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    task.id,
                    task.title,
                    task.description,
                    task.soft_deadline.map(|d| d.timestamp_millis()),
                    task.hard_deadline.map(|d| d.timestamp_millis()),
                    task.is_completed,
                    task.completed_at.map(|d| d.timestamp_millis()),
                    task.archived_at.map(|d| d.timestamp_millis()),
                    task.created_at.timestamp_millis(),
                    task.task_type,
                ],
            )?;

            let max_position: Option<f64> = tx.query_row(
                "SELECT MAX(position) FROM subtasks WHERE task_id = ?1",
                params![task.id],
                |row| row.get(0),
            )?;
            let mut position = max_position.map_or(0.0, |p| p + 1.0);

            for title in subtask_titles {
                tx.execute(
                    "INSERT INTO subtasks
                     (id, task_id, title, is_completed, completed_at, position, created_at)
                     VALUES (?1, ?2, ?3, 0, NULL, ?4, ?5)",
                    params![
                        Uuid::now_v7().to_string(),
                        task.id,
                        title,
                        position,
                        created_at.timestamp_millis(),
                    ],
                )?;
                position += 1.0;
            }

            tx.commit()?;
            Ok(())
        })?;

        self.notify_tasks_changed();
        if !subtask_titles.is_empty() {
            self.notify_subtasks_changed();
        }
        Ok(())
    }
}
