//! Task handler interface
//!
//! A [`TaskHandler`] drives the lifecycle of one task against a concrete
//! backend: local process, cluster job scheduler, cloud batch service. The
//! monitor only ever talks to handlers through this trait.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::batch::{BatchHandler, GridHandler};
use crate::task::TaskRun;

/// Lifecycle operations for one unit of work
///
/// Handlers are shared by reference between the monitor's queues and the
/// caller that created them; all state is interior.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// The task this handler drives
    fn task(&self) -> &Arc<TaskRun>;

    /// Dispatches the task to the backend
    ///
    /// On error the handler must be left in a state where it never entered
    /// the backend; the monitor will not retry the submission.
    async fn submit(&self) -> Result<()>;

    /// Probes whether the task has started running
    ///
    /// Returns `true` on the transition to the running state; the
    /// transition is reported once, repeated calls afterwards return
    /// `false`.
    async fn check_if_running(&self) -> Result<bool>;

    /// Probes whether the task reached a terminal state (success or failure)
    ///
    /// Batch-aware implementations may consult the shared status cache
    /// installed by [`BatchHandler::batch`] instead of probing the backend
    /// directly.
    async fn check_if_completed(&self) -> Result<bool>;

    /// Best-effort termination of the backend task
    async fn kill(&self) -> Result<()>;

    /// Narrows this handler to its batch-aware capability, if it has one
    fn as_batch(&self) -> Option<&dyn BatchHandler> {
        None
    }

    /// Narrows this handler to its grid capability, if it has one
    fn as_grid(&self) -> Option<&dyn GridHandler> {
        None
    }

    /// One-line description used in diagnostic queue dumps
    fn describe(&self) -> String {
        self.task().to_string()
    }
}
