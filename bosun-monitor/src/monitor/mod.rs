//! Task polling monitor
//!
//! The [`TaskMonitor`] is the coordination engine between the workflow layer
//! and the execution backends. Producers hand it task handlers via
//! [`schedule`](TaskMonitor::schedule); a submitter loop promotes them into
//! the bounded running queue and dispatches them, and a poller loop drives
//! every in-flight handler to a terminal state by periodic status probes.
//!
//! The loop bodies live in the sibling modules: [`submitter`] drains the
//! pending queue while slots allow, [`poller`] inspects the running queue on
//! a fixed cadence.

pub mod poller;
pub mod submitter;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bosun_core::{BatchCleanup, TaskHandler};

use crate::config::MonitorConfig;
use crate::session::{Session, ShutdownHook};
use crate::throttle::RateGate;

/// Refinement of the default capacity-based submission policy
///
/// Invoked under the pending-queue lock after the slot check passed; a
/// `false` stops the drain at the current handler, preserving FIFO order.
pub type SubmitPolicy = Box<dyn Fn(&Arc<dyn TaskHandler>) -> bool + Send + Sync>;

/// Bounded-concurrency task polling monitor
///
/// Owns the pending and running queues and the three coordination
/// conditions. Handlers are shared by reference with the caller; the
/// monitor never duplicates one and never holds one after eviction.
pub struct TaskMonitor {
    config: MonitorConfig,
    session: Arc<Session>,

    /// Submitted-but-not-yet-dispatched handlers, FIFO on insertion order.
    /// Its lock also serialises running-queue membership changes performed
    /// from producer and eviction paths with the submitter's drain.
    pending: Mutex<VecDeque<Arc<dyn TaskHandler>>>,

    /// Dispatched handlers awaiting a terminal status; never exceeds the
    /// configured capacity
    running: Mutex<VecDeque<Arc<dyn TaskHandler>>>,

    /// Signalled when a task lands in the pending queue
    task_avail: Notify,

    /// Signalled when a running-queue slot frees up
    slot_avail: Notify,

    /// Signalled by backends that learn of a completion asynchronously;
    /// shortens the poller's next sleep
    task_complete: Notify,

    pending_gate: RateGate,
    running_gate: RateGate,

    submit_policy: Option<SubmitPolicy>,

    threads: StdMutex<Vec<JoinHandle<()>>>,
}

impl TaskMonitor {
    /// Creates a monitor bound to the given session
    pub fn new(session: Arc<Session>, config: MonitorConfig) -> Arc<Self> {
        Self::create(session, config, None)
    }

    /// Creates a monitor with a refined submission policy
    pub fn with_submit_policy(
        session: Arc<Session>,
        config: MonitorConfig,
        policy: SubmitPolicy,
    ) -> Arc<Self> {
        Self::create(session, config, Some(policy))
    }

    fn create(
        session: Arc<Session>,
        config: MonitorConfig,
        submit_policy: Option<SubmitPolicy>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pending_gate: RateGate::new(config.dump_interval),
            running_gate: RateGate::new(config.dump_interval),
            config,
            session,
            pending: Mutex::new(VecDeque::new()),
            running: Mutex::new(VecDeque::new()),
            task_avail: Notify::new(),
            slot_avail: Notify::new(),
            task_complete: Notify::new(),
            submit_policy,
            threads: StdMutex::new(Vec::new()),
        })
    }

    /// Executor name used in log lines
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The monitor configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// The session this monitor is bound to
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Number of tasks waiting for a slot
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Number of tasks currently dispatched
    pub async fn running_count(&self) -> usize {
        self.running.lock().await.len()
    }

    /// Schedules a task handler for execution
    ///
    /// Appends to the pending queue and wakes the submitter whether it is
    /// idle (no work) or parked (no free slot). Returns as soon as the
    /// handler is queued; the queue is unbounded.
    pub async fn schedule(&self, handler: Arc<dyn TaskHandler>) {
        debug!("Scheduled task: {}", handler.describe());
        {
            let mut pending = self.pending.lock().await;
            pending.push_back(handler);
        }
        self.task_avail.notify_one();
        self.slot_avail.notify_one();
    }

    /// Removes a handler from the running queue
    ///
    /// Returns true if the handler was present. Holding the pending-queue
    /// lock serialises the slot signal with the submitter's predicate
    /// re-check, so the wake-up cannot be missed.
    pub async fn evict(&self, handler: &Arc<dyn TaskHandler>) -> bool {
        let task_id = handler.task().id;
        let _pending = self.pending.lock().await;

        let removed = {
            let mut running = self.running.lock().await;
            let before = running.len();
            running.retain(|h| h.task().id != task_id);
            running.len() < before
        };

        if removed {
            self.slot_avail.notify_one();
        }
        removed
    }

    /// Signals that some task completed, shortening the poller's next sleep
    ///
    /// Called by backends that receive asynchronous completion
    /// notifications. A spurious signal is harmless; the poller re-probes.
    pub fn signal(&self) {
        self.task_complete.notify_one();
    }

    /// Starts the monitor: registers with the session and launches the
    /// poller and submitter loops
    ///
    /// Barrier registration happens before either loop runs, so the session
    /// cannot observe an unregistered monitor and terminate early.
    pub fn start(self: &Arc<Self>) {
        info!(
            "Starting task monitor '{}' (capacity: {}, poll interval: {:?})",
            self.name(),
            self.config.capacity,
            self.config.poll_interval
        );

        self.session.barrier().register(self.name());
        self.session.on_shutdown(Arc::clone(self) as Arc<dyn ShutdownHook>);

        let poller = tokio::spawn(Arc::clone(self).poll_loop());
        let submitter = tokio::spawn(Arc::clone(self).submit_loop());

        self.threads.lock().unwrap().extend([poller, submitter]);
    }

    /// Waits for both monitor loops to exit
    pub async fn join(&self) {
        let threads: Vec<_> = {
            let mut threads = self.threads.lock().unwrap();
            threads.drain(..).collect()
        };

        for thread in threads {
            if let Err(e) = thread.await {
                warn!("Monitor '{}' loop panicked: {}", self.name(), e);
            }
        }
    }

    /// Drains the running queue on session shutdown
    ///
    /// Every handler still in flight is killed best-effort, marked aborted,
    /// and reported complete. Popping a handler claims its completion: the
    /// poller never finalises a handler it can no longer evict. Grid
    /// handlers deposit their kills into a shared aggregator flushed once
    /// at the end. The pending-queue lock is never held across the backend
    /// kill calls, which may block on network I/O.
    pub async fn cleanup(&self) {
        let batch = Arc::new(BatchCleanup::new());

        loop {
            let handler = { self.running.lock().await.pop_front() };
            let Some(handler) = handler else { break };

            debug!("Killing task: {}", handler.describe());

            if let Some(grid) = handler.as_grid() {
                grid.cleanup(batch.clone());
            }

            if let Err(e) = handler.kill().await {
                warn!("Failed to kill task {}: {:#}", handler.describe(), e);
            }

            handler.task().mark_aborted();
            self.session.notify_task_complete(handler.task());
        }

        batch.kill().await;

        // wake both loops so they observe the session state and exit
        self.task_avail.notify_one();
        self.slot_avail.notify_one();
        self.task_complete.notify_one();
    }

    /// Default admission check: a slot is free and the refinement (if any)
    /// agrees
    pub(crate) async fn can_submit(&self, handler: &Arc<dyn TaskHandler>) -> bool {
        let running = self.running.lock().await.len();
        if !self.config.capacity.admits(running) {
            return false;
        }

        match &self.submit_policy {
            Some(policy) => policy(handler),
            None => true,
        }
    }

    /// Routes a task failure through its processor's resume-or-die policy
    ///
    /// An unrecoverable outcome faults the session; the monitor observes the
    /// abort flag at its next iteration boundary.
    pub(crate) fn handle_task_error(&self, handler: &Arc<dyn TaskHandler>, error: anyhow::Error) {
        let task = handler.task();
        if let Some(fault) = task.processor().resume_or_die(task, &error) {
            self.session.fault(fault);
        }
    }
}

#[async_trait]
impl ShutdownHook for TaskMonitor {
    async fn on_shutdown(&self) {
        self.cleanup().await;
        self.session.barrier().arrive(self.name());
    }
}
