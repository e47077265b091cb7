//! Subtask table operations.

use super::{Store, from_ms};
use crate::types::Subtask;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};

pub fn parse_subtask_row(row: &Row) -> rusqlite::Result<Subtask> {
    let completed_at: Option<i64> = row.get("completed_at")?;
    let created_at: i64 = row.get("created_at")?;

    Ok(Subtask {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        title: row.get("title")?,
        is_completed: row.get("is_completed")?,
        completed_at: completed_at.map(from_ms),
        position: row.get("position")?,
        created_at: from_ms(created_at),
    })
}

impl Store {
    /// Subtasks of one task in ascending position order.
    pub fn subtasks_for_task(&self, task_id: &str) -> Result<Vec<Subtask>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM subtasks WHERE task_id = ?1 ORDER BY position ASC",
            )?;
            let subtasks = stmt
                .query_map(params![task_id], parse_subtask_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(subtasks)
        })
    }

    /// Every subtask, grouped-friendly order (task, then position). Used by
    /// the joined live views so one query serves the whole snapshot.
    pub fn all_subtasks_ordered(&self) -> Result<Vec<Subtask>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM subtasks ORDER BY task_id, position ASC")?;
            let subtasks = stmt
                .query_map([], parse_subtask_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(subtasks)
        })
    }

    /// Ids starting with `prefix`, for short-id resolution at the surface.
    pub fn find_subtask_ids_by_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM subtasks WHERE id LIKE ?1 ORDER BY id")?;
            let ids = stmt
                .query_map(params![format!("{prefix}%")], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(ids)
        })
    }

    pub fn get_subtask(&self, id: &str) -> Result<Option<Subtask>> {
        self.with_conn(|conn| {
            match conn.query_row(
                "SELECT * FROM subtasks WHERE id = ?1",
                params![id],
                parse_subtask_row,
            ) {
                Ok(subtask) => Ok(Some(subtask)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Number of persisted subtasks under a task.
    pub fn subtask_count(&self, task_id: &str) -> Result<usize> {
        let count: i64 = self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM subtasks WHERE task_id = ?1",
                params![task_id],
                |row| row.get(0),
            )?)
        })?;
        Ok(count as usize)
    }

    /// Append a subtask at `max(position) + 1`, or 0 for the first one.
    /// Returns the stored entity.
    pub fn add_subtask(&self, task_id: &str, title: &str) -> Result<Subtask> {
        let subtask = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let max_position: Option<f64> = tx.query_row(
                "SELECT MAX(position) FROM subtasks WHERE task_id = ?1",
                params![task_id],
                |row| row.get(0),
            )?;
            let subtask = Subtask {
                position: max_position.map_or(0.0, |p| p + 1.0),
                ..Subtask::new(task_id, title)
            };

            tx.execute(
                "INSERT INTO subtasks
                 (id, task_id, title, is_completed, completed_at, position, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    subtask.id,
                    subtask.task_id,
                    subtask.title,
                    subtask.is_completed,
                    subtask.completed_at.map(|d| d.timestamp_millis()),
                    subtask.position,
                    subtask.created_at.timestamp_millis(),
                ],
            )?;

            tx.commit()?;
            Ok(subtask)
        })?;

        self.notify_subtasks_changed();
        Ok(subtask)
    }

    /// Set or clear completion. `is_completed` always mirrors whether a
    /// completion instant is present.
    pub fn set_subtask_completion(
        &self,
        id: &str,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let updated = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE subtasks SET is_completed = ?2, completed_at = ?3 WHERE id = ?1",
                params![
                    id,
                    completed_at.is_some(),
                    completed_at.map(|d| d.timestamp_millis()),
                ],
            )?)
        })?;
        if updated > 0 {
            self.notify_subtasks_changed();
        }
        Ok(updated > 0)
    }

    pub fn delete_subtask(&self, id: &str) -> Result<bool> {
        let deleted = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM subtasks WHERE id = ?1", params![id])?)
        })?;
        if deleted > 0 {
            self.notify_subtasks_changed();
        }
        Ok(deleted > 0)
    }

    /// Write a single fractional position (the common reorder case).
    pub fn update_subtask_position(&self, id: &str, position: f64) -> Result<bool> {
        let updated = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE subtasks SET position = ?2 WHERE id = ?1",
                params![id, position],
            )?)
        })?;
        if updated > 0 {
            self.notify_subtasks_changed();
        }
        Ok(updated > 0)
    }

    /// Rewrite every sibling position in one transaction (the renumber case,
    /// when fractional precision is exhausted).
    pub fn renumber_subtasks(&self, positions: &[(String, f64)]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for (id, position) in positions {
                tx.execute(
                    "UPDATE subtasks SET position = ?2 WHERE id = ?1",
                    params![id, position],
                )?;
            }
            tx.commit()?;
            Ok(())
        })?;

        if !positions.is_empty() {
            self.notify_subtasks_changed();
        }
        Ok(())
    }
}
