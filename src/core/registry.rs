//! Process-scoped task registry.
//!
//! Append-only and insertion-ordered. Constructed once at startup and shared
//! by reference with the command server and the background runners. Tasks are
//! never removed while the daemon runs; pollers filter instead of deleting.

use parking_lot::RwLock;

use super::task::Task;

/// Owns every task for the process lifetime.
///
/// The lock guards short synchronous sections only and is never held across
/// an await point. Readers get cloned snapshots, so a poll can never observe
/// a half-applied transition.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: RwLock<Vec<Task>>,
}

impl TaskRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task and return its ID.
    ///
    /// Insertion order is what the polling surface reports, so this is the
    /// only way tasks enter the registry.
    pub fn insert(&self, task: Task) -> String {
        let id = task.id.clone();
        tracing::debug!(
            task_id = %id,
            task_type = %task.task_type,
            app_id = task.app_id,
            "task created"
        );
        self.tasks.write().push(task);
        id
    }

    /// Snapshot of a single task, if known.
    #[must_use]
    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().iter().find(|t| t.id == task_id).cloned()
    }

    /// Snapshots of every task owned by `app_id`, oldest first, optionally
    /// narrowed to one task type.
    #[must_use]
    pub fn for_app(&self, app_id: i64, task_type: Option<&str>) -> Vec<Task> {
        self.tasks
            .read()
            .iter()
            .filter(|t| t.app_id == app_id)
            .filter(|t| task_type.is_none_or(|wanted| t.task_type == wanted))
            .cloned()
            .collect()
    }

    /// Number of tasks ever accepted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    /// Whether no task has been accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    /// Move a task to `in-progress`. No-op for terminal or unknown tasks.
    pub fn start(&self, task_id: &str) -> bool {
        let mut tasks = self.tasks.write();
        tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .is_some_and(Task::start)
    }

    /// Record terminal success for a task.
    ///
    /// Returns `false` for unknown tasks and for tasks already terminal;
    /// a settled task is never overwritten.
    pub fn finish(
        &self,
        task_id: &str,
        message: impl Into<String>,
        result: serde_json::Value,
    ) -> bool {
        let mut tasks = self.tasks.write();
        let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) else {
            tracing::warn!(task_id = %task_id, "finish for unknown task");
            return false;
        };
        let applied = task.finish(message, result);
        if applied {
            tracing::info!(task_id = %task_id, task_type = %task.task_type, "task finished");
        } else {
            tracing::warn!(
                task_id = %task_id,
                status = %task.status,
                "finish ignored, task already terminal"
            );
        }
        applied
    }

    /// Record terminal failure for a task.
    ///
    /// Returns `false` for unknown tasks and for tasks already terminal.
    pub fn fail(&self, task_id: &str, message: impl Into<String>) -> bool {
        let mut tasks = self.tasks.write();
        let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) else {
            tracing::warn!(task_id = %task_id, "failure report for unknown task");
            return false;
        };
        let applied = task.fail(message);
        if applied {
            tracing::warn!(
                task_id = %task_id,
                task_type = %task.task_type,
                error = %task.message,
                "task failed"
            );
        } else {
            tracing::warn!(
                task_id = %task_id,
                status = %task.status,
                "failure ignored, task already terminal"
            );
        }
        applied
    }
}
