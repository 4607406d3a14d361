//! Status reconciliation
//!
//! Clients speak `todo` / `in-progress` / `done`; storage keeps
//! `todo` / `in-progress` / `completed` plus an independent `completed` flag.
//!
//! - Create: `done` is stored as `completed`; the flag is taken from the
//!   request as-is (default `false`), even if it contradicts the status.
//! - Update, in precedence order:
//!   1. status `done` forces `completed` status and `completed = true`,
//!      overriding any flag in the same request
//!   2. any other status is stored as given; a supplied flag is stored as given
//!   3. flag without status: `true` forces `completed` status, `false` on a
//!      `completed` task resets it to `todo`
//! - Read: `completed` is shown as `done` on a detached copy ([`TaskView`]).
//!
//! [`TaskView`]: crate::models::TaskView

use chrono::{DateTime, Utc};
use surrealdb::sql::Thing;

use crate::models::{ExternalStatus, Priority, Task, TaskStatus};

/// Map an API status to its stored form
pub fn to_internal(status: ExternalStatus) -> TaskStatus {
    match status {
        ExternalStatus::Todo => TaskStatus::Todo,
        ExternalStatus::InProgress => TaskStatus::InProgress,
        ExternalStatus::Done => TaskStatus::Completed,
    }
}

/// Map a stored status to its API form
pub fn to_external(status: TaskStatus) -> ExternalStatus {
    match status {
        TaskStatus::Todo => ExternalStatus::Todo,
        TaskStatus::InProgress => ExternalStatus::InProgress,
        TaskStatus::Completed => ExternalStatus::Done,
    }
}

/// Input for a new task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub priority: Priority,
    pub status: Option<ExternalStatus>,
    pub completed: Option<bool>,
}

impl NewTask {
    /// Build the record to persist for `owner`
    pub fn into_task(self, owner: Thing, now: DateTime<Utc>) -> Task {
        Task {
            id: None,
            owner,
            title: self.title,
            description: self.description,
            deadline: self.deadline,
            priority: self.priority,
            status: self.status.map(to_internal).unwrap_or_default(),
            // Not derived from status; contradictory input is stored as sent.
            completed: self.completed.unwrap_or(false),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update; `None` leaves the stored field unchanged
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub status: Option<ExternalStatus>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Apply the patch to a stored task in place
    pub fn apply(self, task: &mut Task, now: DateTime<Utc>) {
        match (self.status, self.completed) {
            (Some(ExternalStatus::Done), _) => {
                task.status = TaskStatus::Completed;
                task.completed = true;
            }
            (Some(status), completed) => {
                task.status = to_internal(status);
                if let Some(completed) = completed {
                    task.completed = completed;
                }
            }
            (None, Some(true)) => {
                task.completed = true;
                task.status = TaskStatus::Completed;
            }
            (None, Some(false)) => {
                task.completed = false;
                if task.status == TaskStatus::Completed {
                    task.status = TaskStatus::Todo;
                }
            }
            (None, None) => {}
        }

        if let Some(title) = self.title.filter(|t| !t.is_empty()) {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }

        task.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskView;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap()
    }

    fn owner() -> Thing {
        Thing::from(("account", "alice"))
    }

    fn new_task(status: Option<ExternalStatus>, completed: Option<bool>) -> NewTask {
        NewTask {
            title: "T".to_string(),
            description: None,
            deadline: now() + Duration::days(1),
            priority: Priority::High,
            status,
            completed,
        }
    }

    fn stored(status: TaskStatus, completed: bool) -> Task {
        let mut task = new_task(None, None).into_task(owner(), now());
        task.status = status;
        task.completed = completed;
        task
    }

    #[test]
    fn test_vocabulary_round_trip() {
        for status in [ExternalStatus::Todo, ExternalStatus::InProgress, ExternalStatus::Done] {
            assert_eq!(to_external(to_internal(status)), status);
        }
    }

    #[test]
    fn test_create_done_is_stored_completed() {
        let task = new_task(Some(ExternalStatus::Done), Some(true)).into_task(owner(), now());
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(TaskView::from(&task).status, ExternalStatus::Done);
    }

    #[test]
    fn test_create_defaults() {
        let task = new_task(None, None).into_task(owner(), now());
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(!task.completed);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_create_does_not_derive_completed_flag() {
        // Contradictory input is persisted as sent.
        let task = new_task(Some(ExternalStatus::Done), None).into_task(owner(), now());
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(!task.completed);

        let task = new_task(Some(ExternalStatus::Todo), Some(true)).into_task(owner(), now());
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.completed);
    }

    #[test]
    fn test_update_done_forces_completed_flag() {
        let mut task = stored(TaskStatus::Todo, false);
        TaskPatch {
            status: Some(ExternalStatus::Done),
            completed: Some(false),
            ..Default::default()
        }
        .apply(&mut task, now());

        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed);
    }

    #[test]
    fn test_update_other_status_keeps_flag_unless_supplied() {
        let mut task = stored(TaskStatus::Completed, true);
        TaskPatch {
            status: Some(ExternalStatus::InProgress),
            ..Default::default()
        }
        .apply(&mut task, now());
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.completed);

        TaskPatch {
            status: Some(ExternalStatus::Todo),
            completed: Some(false),
            ..Default::default()
        }
        .apply(&mut task, now());
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(!task.completed);
    }

    #[test]
    fn test_update_flag_true_without_status() {
        let mut task = stored(TaskStatus::InProgress, false);
        TaskPatch {
            completed: Some(true),
            ..Default::default()
        }
        .apply(&mut task, now());

        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed);
    }

    #[test]
    fn test_update_flag_false_resets_completed_to_todo() {
        let mut task = stored(TaskStatus::Completed, true);
        TaskPatch {
            completed: Some(false),
            ..Default::default()
        }
        .apply(&mut task, now());

        assert_eq!(task.status, TaskStatus::Todo);
        assert!(!task.completed);
    }

    #[test]
    fn test_update_flag_false_leaves_in_progress() {
        let mut task = stored(TaskStatus::InProgress, true);
        TaskPatch {
            completed: Some(false),
            ..Default::default()
        }
        .apply(&mut task, now());

        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(!task.completed);
    }

    #[test]
    fn test_update_plain_fields() {
        let mut task = stored(TaskStatus::Todo, false);
        task.description = Some("old".to_string());
        let later = now() + Duration::hours(3);
        let deadline = now() + Duration::days(7);

        TaskPatch {
            title: Some("Renamed".to_string()),
            description: Some(None),
            deadline: Some(deadline),
            priority: Some(Priority::Urgent),
            ..Default::default()
        }
        .apply(&mut task, later);

        assert_eq!(task.title, "Renamed");
        assert_eq!(task.description, None);
        assert_eq!(task.deadline, deadline);
        assert_eq!(task.priority, Priority::Urgent);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.updated_at, later);
    }

    #[test]
    fn test_update_empty_title_is_ignored() {
        let mut task = stored(TaskStatus::Todo, false);
        TaskPatch {
            title: Some(String::new()),
            ..Default::default()
        }
        .apply(&mut task, now());

        assert_eq!(task.title, "T");
    }
}
