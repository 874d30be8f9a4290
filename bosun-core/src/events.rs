//! Task lifecycle events
//!
//! The session fans task lifecycle notifications out to registered
//! listeners: workflow progress displays, trace writers, metrics.

use std::sync::Arc;

use crate::task::TaskRun;

/// Observer of task lifecycle transitions
///
/// Notifications are invoked inline on the monitor loops; implementations
/// must not block.
pub trait TaskEventListener: Send + Sync {
    /// A task was dispatched to its backend
    fn on_task_submit(&self, _task: &Arc<TaskRun>) {}

    /// A task was observed to start running
    fn on_task_start(&self, _task: &Arc<TaskRun>) {}

    /// A task reached a terminal state or was killed during teardown
    fn on_task_complete(&self, _task: &Arc<TaskRun>) {}
}
