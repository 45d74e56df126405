//! Core daemon logic shared by the HTTP surface and the CLI.

pub mod gateway;
pub mod registry;
pub mod task;

use std::future::Future;
use std::sync::Arc;

pub use gateway::{Gateway, GatewayError};
pub use registry::TaskRegistry;
pub use task::{Task, TaskStatus};

/// Run a background operation under a supervisor.
///
/// The operation itself settles its task (finish or fail); the supervisor
/// only watches the join handle. If the operation panics or is aborted, the
/// fault is logged and recorded on the owning task, and nothing else in the
/// process is disturbed.
pub fn spawn_supervised<F>(registry: Arc<TaskRegistry>, task_id: String, operation: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(operation);
    tokio::spawn(async move {
        if let Err(err) = handle.await {
            tracing::error!(task_id = %task_id, error = %err, "background operation aborted");
            registry.fail(&task_id, format!("internal error: {err}"));
        }
    });
}
