//! Poller loop
//!
//! Drives the running queue toward empty: on every cycle each in-flight
//! handler is probed for its running and terminal transitions, completed
//! handlers are evicted and finalised, and the loop sleeps out the rest of
//! the poll interval on the *task completed* condition.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::time::{self, Instant};
use tracing::{debug, info, trace};

use bosun_core::{BatchContext, TaskHandler, TaskSummary};

use super::TaskMonitor;

impl TaskMonitor {
    /// Long-lived poller: probes every running handler on a fixed cadence
    /// until the session terminates or aborts
    pub(crate) async fn poll_loop(self: Arc<Self>) {
        info!("Task monitor '{}' poll loop started", self.name());

        loop {
            let cycle_start = Instant::now();

            // snapshot so probing never holds the queue lock; eviction may
            // run concurrently
            let snapshot: Vec<Arc<dyn TaskHandler>> = {
                self.running.lock().await.iter().cloned().collect()
            };

            self.attach_batch_collectors(&snapshot);

            for handler in &snapshot {
                self.check_task(handler).await;
            }

            if self.poller_should_exit().await {
                break;
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < self.config.poll_interval {
                let notified = self.task_complete.notified();
                let _ = time::timeout(self.config.poll_interval - elapsed, notified).await;
            }

            if self.session.is_aborted() {
                break;
            }

            self.dump_running_queue().await;
        }

        // release a submitter parked on either pending-queue condition
        self.task_avail.notify_one();
        self.slot_avail.notify_one();

        info!("Task monitor '{}' poll loop terminated", self.name());
    }

    async fn poller_should_exit(&self) -> bool {
        if self.session.is_aborted() {
            return true;
        }
        if !self.session.is_terminated() {
            return false;
        }
        let pending_empty = self.pending.lock().await.is_empty();
        let running_empty = self.running.lock().await.is_empty();
        pending_empty && running_empty
    }

    /// Builds the per-cycle batch collectors
    ///
    /// Handlers sharing a batch key get the same collector, so their status
    /// probes can be coalesced into one backend call this cycle.
    fn attach_batch_collectors(&self, snapshot: &[Arc<dyn TaskHandler>]) {
        let mut contexts: HashMap<String, Arc<BatchContext>> = HashMap::new();

        for handler in snapshot {
            if let Some(batch) = handler.as_batch() {
                let context = contexts
                    .entry(batch.batch_key().to_string())
                    .or_insert_with(|| Arc::new(BatchContext::new()));
                batch.batch(context.clone());
            }
        }

        if !contexts.is_empty() {
            trace!(
                "Monitor '{}' created {} batch collector(s)",
                self.name(),
                contexts.len()
            );
        }
    }

    /// Probes one handler, routing any failure through the fault policy
    ///
    /// One sick task must not stall the rest of the cycle.
    async fn check_task(&self, handler: &Arc<dyn TaskHandler>) {
        if let Err(error) = self.check_task_status(handler).await {
            debug!(
                "Status check failed for task {}: {:#}",
                handler.describe(),
                error
            );
            self.handle_task_error(handler, error);
        }
    }

    /// Advances one handler's observable state
    async fn check_task_status(&self, handler: &Arc<dyn TaskHandler>) -> Result<()> {
        if handler.check_if_running().await? {
            debug!("Task started: {}", handler.describe());
            self.session.notify_task_start(handler.task());
        }

        if handler.check_if_completed().await? {
            debug!("Task completed: {}", handler.describe());

            // removing the handler is the claim on its completion; a
            // concurrent shutdown drain may have claimed it already
            if !self.evict(handler).await {
                return Ok(());
            }

            let task = handler.task();
            let fault = task.processor().finalize_task(task);

            if let Some(latch) = task.latch() {
                latch.count_down();
            }
            self.session.notify_task_complete(task);

            if let Some(fault) = fault {
                self.session.fault(fault);
            }
        }

        Ok(())
    }

    /// Throttled diagnostic snapshot of the running queue
    async fn dump_running_queue(&self) {
        if !self.running_gate.try_emit() {
            return;
        }

        let summaries: Vec<TaskSummary> = {
            self.running
                .lock()
                .await
                .iter()
                .map(|h| h.task().summary())
                .collect()
        };

        debug!(
            "Monitor '{}' running queue ({} task(s)): {}",
            self.name(),
            summaries.len(),
            serde_json::to_string(&summaries).unwrap_or_default()
        );

        if let Some(status) = self.session.dump_network_status() {
            debug!("Monitor '{}' network status: {}", self.name(), status);
        }
    }
}
