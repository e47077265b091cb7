//! Buffered task editing with a typed save boundary.
//!
//! `TaskEditor` holds in-flight form state for a task that does not exist
//! yet ("new" mode) or one loaded from the store ("edit" mode). Validation
//! failures and storage failures are distinguished by [`SaveError`] so
//! callers can render them differently.

use crate::db::Store;
use crate::deadline::local_midnight;
use crate::error::SaveError;
use crate::types::Task;
use chrono::{NaiveDate, TimeZone};

/// Soft warning threshold for subtasks on one task. Informational only;
/// nothing blocks at this count.
pub const SUBTASK_WARNING_THRESHOLD: usize = 20;

enum Mode {
    New,
    Edit(Task),
}

/// Form state for creating or editing one task.
///
/// Deadlines are edited at date granularity and persisted as local midnight
/// of the chosen date. In new mode, subtask titles buffer locally and only
/// persist with the parent task; in edit mode the buffer is normally empty
/// because subtask mutations go straight to the store.
pub struct TaskEditor {
    store: Store,
    mode: Mode,
    persisted_subtasks: usize,
    pub title: String,
    pub description: String,
    pub soft_deadline: Option<NaiveDate>,
    pub hard_deadline: Option<NaiveDate>,
    buffered_subtasks: Vec<String>,
}

impl TaskEditor {
    /// Editor for a task that does not exist yet.
    pub fn new(store: Store) -> Self {
        Self {
            store,
            mode: Mode::New,
            persisted_subtasks: 0,
            title: String::new(),
            description: String::new(),
            soft_deadline: None,
            hard_deadline: None,
            buffered_subtasks: Vec::new(),
        }
    }

    /// Editor bound to an existing task. Deadline instants surface as dates
    /// in `tz` so edits round-trip at date granularity.
    pub fn edit<Tz: TimeZone>(store: Store, task_id: &str, tz: &Tz) -> Result<Self, SaveError> {
        let task = store
            .get_task(task_id)?
            .ok_or_else(|| SaveError::TaskNotFound(task_id.to_string()))?;
        let persisted_subtasks = store.subtask_count(task_id)?;
        Ok(Self {
            store,
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            soft_deadline: task.soft_deadline.map(|d| d.with_timezone(tz).date_naive()),
            hard_deadline: task.hard_deadline.map(|d| d.with_timezone(tz).date_naive()),
            mode: Mode::Edit(task),
            persisted_subtasks,
            buffered_subtasks: Vec::new(),
        })
    }

    /// The bound task id, if editing an existing task.
    pub fn task_id(&self) -> Option<&str> {
        match &self.mode {
            Mode::New => None,
            Mode::Edit(task) => Some(&task.id),
        }
    }

    /// Buffer a subtask title for persistence with the next save. Blank
    /// titles are dropped.
    pub fn add_subtask_entry(&mut self, title: &str) {
        let trimmed = title.trim();
        if !trimmed.is_empty() {
            self.buffered_subtasks.push(trimmed.to_string());
        }
    }

    /// Remove a buffered entry by index. Out-of-range is a no-op.
    pub fn remove_subtask_entry(&mut self, index: usize) {
        if index < self.buffered_subtasks.len() {
            self.buffered_subtasks.remove(index);
        }
    }

    pub fn buffered_subtasks(&self) -> &[String] {
        &self.buffered_subtasks
    }

    /// True once persisted plus buffered subtasks reach the warning
    /// threshold.
    pub fn subtask_count_warning(&self) -> bool {
        self.persisted_subtasks + self.buffered_subtasks.len() >= SUBTASK_WARNING_THRESHOLD
    }

    /// Save is blocked while the title is blank.
    pub fn can_save(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Persist the task and any buffered subtasks in one transaction.
    /// Returns the task id. In edit mode `created_at`, completion state,
    /// and `task_type` are preserved from the loaded task.
    pub fn save<Tz: TimeZone>(&mut self, tz: &Tz) -> Result<String, SaveError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(SaveError::EmptyTitle);
        }
        let description = match self.description.trim() {
            "" => None,
            text => Some(text.to_string()),
        };
        let soft = self.soft_deadline.map(|date| local_midnight(date, tz));
        let hard = self.hard_deadline.map(|date| local_midnight(date, tz));

        let task = match &self.mode {
            Mode::New => Task {
                title: title.to_string(),
                description,
                soft_deadline: soft,
                hard_deadline: hard,
                ..Task::new(title)
            },
            Mode::Edit(existing) => Task {
                title: title.to_string(),
                description,
                soft_deadline: soft,
                hard_deadline: hard,
                ..existing.clone()
            },
        };

        self.store
            .save_task_with_subtasks(&task, &self.buffered_subtasks)?;
        self.persisted_subtasks += self.buffered_subtasks.len();
        self.buffered_subtasks.clear();
        self.mode = Mode::Edit(task.clone());
        Ok(task.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn test_blank_title_blocks_save() {
        let store = store();
        let mut editor = TaskEditor::new(store.clone());
        editor.title = "   ".to_string();

        assert!(!editor.can_save());
        assert!(matches!(editor.save(&Utc), Err(SaveError::EmptyTitle)));
        assert!(store.active_tasks(Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn test_new_mode_saves_buffered_subtasks_in_order() {
        let store = store();
        let mut editor = TaskEditor::new(store.clone());
        editor.title = "Pack for the trip".to_string();
        editor.add_subtask_entry("Passport");
        editor.add_subtask_entry("   ");
        editor.add_subtask_entry("  Chargers  ");

        let id = editor.save(&Utc).unwrap();
        let subtasks = store.subtasks_for_task(&id).unwrap();
        let titles: Vec<&str> = subtasks.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Passport", "Chargers"]);
        assert!(editor.buffered_subtasks().is_empty());
    }

    #[test]
    fn test_remove_buffered_entry_by_index() {
        let mut editor = TaskEditor::new(store());
        editor.add_subtask_entry("a");
        editor.add_subtask_entry("b");
        editor.add_subtask_entry("c");

        editor.remove_subtask_entry(1);
        assert_eq!(editor.buffered_subtasks(), &["a", "c"]);

        editor.remove_subtask_entry(10);
        assert_eq!(editor.buffered_subtasks(), &["a", "c"]);
    }

    #[test]
    fn test_blank_description_stored_as_absent() {
        let store = store();
        let mut editor = TaskEditor::new(store.clone());
        editor.title = "Title".to_string();
        editor.description = "  \n ".to_string();

        let id = editor.save(&Utc).unwrap();
        let task = store.get_task(&id).unwrap().unwrap();
        assert_eq!(task.description, None);
    }

    #[test]
    fn test_deadlines_persist_at_local_midnight() {
        let store = store();
        let mut editor = TaskEditor::new(store.clone());
        editor.title = "Taxes".to_string();
        editor.soft_deadline = NaiveDate::from_ymd_opt(2025, 4, 10);
        editor.hard_deadline = NaiveDate::from_ymd_opt(2025, 4, 15);

        let id = editor.save(&Utc).unwrap();
        let task = store.get_task(&id).unwrap().unwrap();
        let soft = task.soft_deadline.unwrap();
        assert_eq!(soft.date_naive(), NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
        assert_eq!(soft.format("%H:%M:%S").to_string(), "00:00:00");
        assert!(task.hard_deadline.unwrap() > soft);
    }

    #[test]
    fn test_edit_mode_preserves_identity_and_completion() {
        let store = store();
        let original = Task::new("Original");
        store.insert_task(&original).unwrap();
        let completed_at = Utc::now();
        store.complete_task(&original.id, completed_at).unwrap();

        let mut editor = TaskEditor::edit(store.clone(), &original.id, &Utc).unwrap();
        assert_eq!(editor.task_id(), Some(original.id.as_str()));
        editor.title = "Renamed".to_string();
        let id = editor.save(&Utc).unwrap();
        assert_eq!(id, original.id);

        let task = store.get_task(&id).unwrap().unwrap();
        assert_eq!(task.title, "Renamed");
        assert_eq!(
            task.created_at.timestamp_millis(),
            original.created_at.timestamp_millis()
        );
        assert!(task.is_completed);
        assert_eq!(
            task.completed_at.map(|t| t.timestamp_millis()),
            Some(completed_at.timestamp_millis())
        );
    }

    #[test]
    fn test_edit_unknown_id_is_a_typed_error() {
        let result = TaskEditor::edit(store(), "missing", &Utc);
        assert!(matches!(result, Err(SaveError::TaskNotFound(id)) if id == "missing"));
    }

    #[test]
    fn test_subtask_warning_counts_persisted_and_buffered() {
        let store = store();
        let task = Task::new("Big");
        store.insert_task(&task).unwrap();
        for i in 0..18 {
            store.add_subtask(&task.id, &format!("s{i}")).unwrap();
        }

        let mut editor = TaskEditor::edit(store, &task.id, &Utc).unwrap();
        assert!(!editor.subtask_count_warning());
        editor.add_subtask_entry("s18");
        assert!(!editor.subtask_count_warning());
        editor.add_subtask_entry("s19");
        assert!(editor.subtask_count_warning());
    }
}
