//! Task processor interface
//!
//! The processor is the workflow-side owner of a task: it decides whether a
//! failed task can be retried and finalises tasks that reach a terminal
//! state. The monitor never makes retry decisions itself; it routes every
//! failure through the task's processor.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::task::TaskRun;

/// Fault policy and finalisation hook for the tasks of one process
///
/// Implementations are policy objects: decisions only, no I/O. Both methods
/// are invoked inline on the monitor loops.
pub trait TaskProcessor: Send + Sync {
    /// Name of the owning process, used in log lines
    fn name(&self) -> &str;

    /// Decides whether a failed task can be recovered
    ///
    /// Returns `None` when the task will be resumed or retried by the
    /// workflow layer, or a [`TaskFault`] when the failure is unrecoverable.
    /// A returned fault aborts the whole session.
    fn resume_or_die(&self, task: &Arc<TaskRun>, error: &anyhow::Error) -> Option<TaskFault>;

    /// Finalises a task that reached a terminal state
    ///
    /// Returns a [`TaskFault`] when finalisation determined the task failed
    /// beyond recovery, which aborts the session.
    fn finalize_task(&self, task: &Arc<TaskRun>) -> Option<TaskFault>;
}

/// Unrecoverable task failure descriptor
///
/// Produced by a processor's resume-or-die policy; passing one to the
/// session aborts the run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskFault {
    pub task_id: Uuid,
    pub task_name: String,
    pub message: String,
}

impl TaskFault {
    /// Creates a fault for the given task
    pub fn new(task: &TaskRun, message: impl Into<String>) -> Self {
        Self {
            task_id: task.id,
            task_name: task.name.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "task '{}' [{}] failed: {}",
            self.task_name, self.task_id, self.message
        )
    }
}
