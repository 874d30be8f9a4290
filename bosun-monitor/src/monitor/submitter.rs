//! Submitter loop
//!
//! Drains the pending queue into the running queue while slots allow. The
//! whole drain runs under the pending-queue lock, including the backend
//! submission itself, so capacity checks and queue membership stay
//! consistent with concurrent scheduling and eviction.

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use bosun_core::{TaskHandler, TaskSummary};

use super::TaskMonitor;

impl TaskMonitor {
    /// Long-lived submitter: promotes pending handlers until the session
    /// stops producing work
    ///
    /// Each iteration either promotes at least one handler or parks on one
    /// of the two pending-queue conditions until a predicate changes.
    pub(crate) async fn submit_loop(self: Arc<Self>) {
        debug!("Task submitter for monitor '{}' started", self.name());

        loop {
            if self.submitter_should_exit().await {
                break;
            }

            let mut pending = self.pending.lock().await;

            if pending.is_empty() {
                let notified = self.task_avail.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                drop(pending);
                notified.await;
                continue;
            }

            if self.submit_pending_tasks(&mut pending).await == 0 {
                self.dump_pending_queue(&pending);

                let notified = self.slot_avail.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                drop(pending);
                notified.await;
            }
        }

        debug!("Task submitter for monitor '{}' terminated", self.name());
    }

    async fn submitter_should_exit(&self) -> bool {
        if self.session.is_aborted() || self.session.is_cancelled() {
            return true;
        }
        self.session.is_terminated() && self.pending.lock().await.is_empty()
    }

    /// Drains the head of the pending queue while admission succeeds
    ///
    /// Stops at the first handler refused by `can_submit` and on session
    /// abort or cancellation; the handler at the stop point and all its
    /// successors stay queued, so FIFO order survives a later resume. A
    /// failed submission removes the handler without it ever entering the
    /// running queue. Returns the number of handlers promoted.
    pub(crate) async fn submit_pending_tasks(
        &self,
        pending: &mut VecDeque<Arc<dyn TaskHandler>>,
    ) -> usize {
        let mut submitted = 0;

        loop {
            let Some(head) = pending.front() else { break };

            if !self.can_submit(head).await {
                break;
            }

            if self.session.is_aborted() || self.session.is_cancelled() {
                break;
            }

            let Some(handler) = pending.pop_front() else { break };

            match self.submit_handler(&handler).await {
                Ok(()) => submitted += 1,
                Err(error) => {
                    warn!(
                        "Failed to submit task {}: {:#}",
                        handler.describe(),
                        error
                    );
                    self.handle_task_error(&handler, error);
                    self.session.notify_task_complete(handler.task());
                }
            }
        }

        submitted
    }

    /// Dispatches one handler and appends it to the running queue
    async fn submit_handler(&self, handler: &Arc<dyn TaskHandler>) -> Result<()> {
        handler.submit().await?;

        {
            let mut running = self.running.lock().await;
            debug_assert!(self.config.capacity.admits(running.len()));
            running.push_back(handler.clone());
        }

        debug!("Submitted task: {}", handler.describe());
        self.session.notify_task_submit(handler.task());
        Ok(())
    }

    /// Throttled diagnostic snapshot of the pending queue, emitted when an
    /// iteration promoted nothing
    fn dump_pending_queue(&self, pending: &VecDeque<Arc<dyn TaskHandler>>) {
        if !self.pending_gate.try_emit() {
            return;
        }

        let summaries: Vec<TaskSummary> = pending.iter().map(|h| h.task().summary()).collect();
        debug!(
            "Monitor '{}' pending queue ({} task(s), no free slot): {}",
            self.name(),
            summaries.len(),
            serde_json::to_string(&summaries).unwrap_or_default()
        );
    }
}
