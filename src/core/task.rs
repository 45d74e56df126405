//! Task records and their lifecycle.
//!
//! A [`Task`] tracks one fire-and-forget operation from intake to a terminal
//! state. Records are plain data: polling clients receive clones, and only
//! the operation driving a task moves it forward (through the registry).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Mint a registry-unique task ID.
#[must_use]
pub fn new_task_id() -> String {
    format!("task_{}", Ulid::new())
}

/// Lifecycle state of a [`Task`].
///
/// States only move forward: `created` → `in-progress` → `finished` or
/// `error`. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Accepted and scheduled; the record is usable immediately.
    Created,
    /// The driving operation is underway.
    InProgress,
    /// Terminal success; the result payload is available.
    Finished,
    /// Terminal failure; the message carries the error description.
    Error,
}

impl TaskStatus {
    /// Whether this state admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Created => "created",
            Self::InProgress => "in-progress",
            Self::Finished => "finished",
            Self::Error => "error",
        };
        f.write_str(status)
    }
}

/// One tracked unit of asynchronous work.
///
/// Created by a command handler, appended to the registry, and mutated in
/// place by exactly one background operation. `data` is a snapshot of the
/// originating request and is never touched after construction.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Task {
    /// Opaque ID, unique for the process lifetime (`task_<ULID>`).
    #[serde(rename = "task_id")]
    pub id: String,
    /// Owning GUI session (the add-on sends its host-process PID).
    pub app_id: i64,
    /// Operation tag, e.g. `ratings/get_rating`.
    pub task_type: String,
    /// Immutable copy of the originating request payload.
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Progress or result description; error detail when status is `error`.
    pub message: String,
    /// Completion percentage, 0-100.
    pub progress: u8,
    /// Response payload, present only after a successful finish.
    #[schema(value_type = Option<Object>)]
    pub result: Option<serde_json::Value>,
    /// When the task was accepted.
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal state.
    #[schema(value_type = Option<String>)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a task in the `created` state with a fresh ID.
    #[must_use]
    pub fn new(
        data: serde_json::Value,
        app_id: i64,
        task_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: new_task_id(),
            app_id,
            task_type: task_type.into(),
            data,
            status: TaskStatus::Created,
            message: message.into(),
            progress: 0,
            result: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Mark the driving operation as underway.
    ///
    /// The message set at creation already describes the operation, so this
    /// touches nothing but the status. Returns `false` if the task is
    /// already terminal.
    pub fn start(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::InProgress;
        true
    }

    /// Terminal success: store the response payload and final message.
    ///
    /// Returns `false` without touching the record if the task is already
    /// terminal; a task never leaves `finished` or `error`.
    pub fn finish(&mut self, message: impl Into<String>, result: serde_json::Value) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Finished;
        self.message = message.into();
        self.progress = 100;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        true
    }

    /// Terminal failure: record the error description, drop any result.
    ///
    /// Returns `false` without touching the record if the task is already
    /// terminal.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Error;
        self.message = message.into();
        self.result = None;
        self.finished_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_task_starts_created_with_no_result() {
        let task = Task::new(json!({"asset_id": "123"}), 42, "ratings/get_rating", "queued");

        assert_eq!(task.status, TaskStatus::Created);
        assert_eq!(task.app_id, 42);
        assert_eq!(task.task_type, "ratings/get_rating");
        assert_eq!(task.message, "queued");
        assert_eq!(task.progress, 0);
        assert!(task.result.is_none());
        assert!(task.finished_at.is_none());
    }

    #[test]
    fn task_ids_are_unique_and_prefixed() {
        let a = new_task_id();
        let b = new_task_id();

        assert!(a.starts_with("task_"));
        assert_eq!(a.len(), "task_".len() + 26);
        assert_ne!(a, b);
    }

    #[test]
    fn finish_stores_result_and_message() {
        let mut task = Task::new(json!({}), 1, "ratings/get_rating", "queued");

        assert!(task.finish("done", json!({"rating": 4.5})));
        assert_eq!(task.status, TaskStatus::Finished);
        assert_eq!(task.message, "done");
        assert_eq!(task.progress, 100);
        assert_eq!(task.result, Some(json!({"rating": 4.5})));
        assert!(task.finished_at.is_some());
    }

    #[test]
    fn fail_records_detail_and_clears_result() {
        let mut task = Task::new(json!({}), 1, "ratings/send_rating", "queued");

        assert!(task.fail("connection refused"));
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.message, "connection refused");
        assert!(task.result.is_none());
        assert!(task.finished_at.is_some());
    }

    #[test]
    fn terminal_states_never_regress() {
        let mut task = Task::new(json!({}), 1, "ratings/get_rating", "queued");
        assert!(task.finish("done", json!({"rating": 4.5})));

        assert!(!task.fail("late failure"));
        assert_eq!(task.status, TaskStatus::Finished);
        assert_eq!(task.message, "done");
        assert_eq!(task.result, Some(json!({"rating": 4.5})));

        assert!(!task.start());
        assert_eq!(task.status, TaskStatus::Finished);

        let mut failed = Task::new(json!({}), 1, "ratings/get_rating", "queued");
        assert!(failed.fail("boom"));
        assert!(!failed.finish("too late", json!({})));
        assert_eq!(failed.status, TaskStatus::Error);
        assert!(failed.result.is_none());
    }

    #[test]
    fn start_moves_created_to_in_progress() {
        let mut task = Task::new(json!({}), 1, "ratings/get_bookmarks", "queued");

        assert!(task.start());
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.message, "queued");
        assert!(!task.status.is_terminal());
    }

    #[test]
    fn status_uses_kebab_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            r#""in-progress""#
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Created).unwrap(),
            r#""created""#
        );
        let status: TaskStatus = serde_json::from_str(r#""error""#).unwrap();
        assert_eq!(status, TaskStatus::Error);
    }

    #[test]
    fn snapshot_exposes_wire_field_names() {
        let task = Task::new(json!({"api_key": ""}), 7, "ratings/get_bookmarks", "queued");
        let json = serde_json::to_string(&task).unwrap();

        assert!(json.contains(r#""task_id":"task_"#));
        assert!(json.contains(r#""app_id":7"#));
        assert!(json.contains(r#""task_type":"ratings/get_bookmarks""#));
        assert!(json.contains(r#""status":"created""#));
    }
}
