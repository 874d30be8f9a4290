//! Execution session
//!
//! The session is the collaborator every monitor shares: it carries the
//! run-wide lifecycle flags, the first-fault record, per-executor settings,
//! the monitor barrier, shutdown hooks, and the task event listeners. It is
//! created before any monitor and survives until after the barrier releases.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use bosun_core::{TaskEventListener, TaskFault, TaskRun};

use crate::barrier::MonitorBarrier;
use crate::config::SlotLimit;

/// Per-executor settings overriding the monitor defaults
#[derive(Debug, Clone, Default)]
pub struct ExecutorSettings {
    /// Override for the monitor slot capacity
    pub queue_size: Option<SlotLimit>,

    /// Override for the polling cadence
    pub poll_interval: Option<Duration>,

    /// Override for the diagnostic dump spacing
    pub dump_interval: Option<Duration>,
}

/// Session-level configuration: global defaults plus per-executor overrides
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Settings applied to every executor unless overridden
    pub defaults: ExecutorSettings,

    /// Settings keyed by executor name
    pub executors: HashMap<String, ExecutorSettings>,
}

impl SessionConfig {
    /// Adds settings for the named executor
    pub fn executor(mut self, name: impl Into<String>, settings: ExecutorSettings) -> Self {
        self.executors.insert(name.into(), settings);
        self
    }

    /// Sets the global default settings
    pub fn with_defaults(mut self, defaults: ExecutorSettings) -> Self {
        self.defaults = defaults;
        self
    }

    /// Slot capacity for the named executor, if configured
    pub fn queue_size(&self, name: &str) -> Option<SlotLimit> {
        self.executors
            .get(name)
            .and_then(|s| s.queue_size)
            .or(self.defaults.queue_size)
    }

    /// Polling cadence for the named executor, if configured
    pub fn poll_interval(&self, name: &str) -> Option<Duration> {
        self.executors
            .get(name)
            .and_then(|s| s.poll_interval)
            .or(self.defaults.poll_interval)
    }

    /// Diagnostic dump spacing for the named executor, if configured
    pub fn monitor_dump_interval(&self, name: &str) -> Option<Duration> {
        self.executors
            .get(name)
            .and_then(|s| s.dump_interval)
            .or(self.defaults.dump_interval)
    }
}

/// Callback invoked while the session shuts down
#[async_trait]
pub trait ShutdownHook: Send + Sync {
    async fn on_shutdown(&self);
}

type NetworkStatusFn = Box<dyn Fn() -> String + Send + Sync>;

/// Run-wide coordination object shared by all monitors
pub struct Session {
    config: SessionConfig,

    terminated: AtomicBool,
    aborted: AtomicBool,
    cancelled: AtomicBool,

    /// First unrecoverable fault observed in this run
    fault: Mutex<Option<TaskFault>>,

    barrier: MonitorBarrier,
    hooks: Mutex<Vec<Arc<dyn ShutdownHook>>>,
    listeners: Mutex<Vec<Arc<dyn TaskEventListener>>>,
    network_status: Mutex<Option<NetworkStatusFn>>,
}

impl Session {
    /// Creates a new session with the given configuration
    pub fn new(config: SessionConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            terminated: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            fault: Mutex::new(None),
            barrier: MonitorBarrier::new(),
            hooks: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            network_status: Mutex::new(None),
        })
    }

    /// The session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The monitor rendezvous barrier
    pub fn barrier(&self) -> &MonitorBarrier {
        &self.barrier
    }

    /// Whether the session finished producing work
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Whether the session was aborted
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Whether the session was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Marks the session as done producing work
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
    }

    /// Requests a soft stop: no new submissions, in-flight tasks drain
    pub fn cancel(&self) {
        info!("Session cancelled");
        self.cancelled.store(true, Ordering::Release);
    }

    /// Aborts the session; monitors observe the flag at their next iteration
    pub fn abort(&self) {
        if !self.aborted.swap(true, Ordering::AcqRel) {
            info!("Session aborted");
        }
    }

    /// Records an unrecoverable task fault and aborts the session
    ///
    /// Only the first fault is kept; later ones are logged and dropped.
    pub fn fault(&self, fault: TaskFault) {
        error!("Session fault: {}", fault);
        {
            let mut slot = self.fault.lock().unwrap();
            if slot.is_none() {
                *slot = Some(fault);
            }
        }
        self.abort();
    }

    /// The first fault recorded in this run, if any
    pub fn first_fault(&self) -> Option<TaskFault> {
        self.fault.lock().unwrap().clone()
    }

    /// Registers a task lifecycle listener
    pub fn add_listener(&self, listener: Arc<dyn TaskEventListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    /// Notifies listeners that a task was dispatched to its backend
    pub fn notify_task_submit(&self, task: &Arc<TaskRun>) {
        for listener in self.listeners_snapshot() {
            listener.on_task_submit(task);
        }
    }

    /// Notifies listeners that a task was observed running
    pub fn notify_task_start(&self, task: &Arc<TaskRun>) {
        for listener in self.listeners_snapshot() {
            listener.on_task_start(task);
        }
    }

    /// Notifies listeners that a task reached a terminal state
    pub fn notify_task_complete(&self, task: &Arc<TaskRun>) {
        for listener in self.listeners_snapshot() {
            listener.on_task_complete(task);
        }
    }

    fn listeners_snapshot(&self) -> Vec<Arc<dyn TaskEventListener>> {
        self.listeners.lock().unwrap().clone()
    }

    /// Registers a callback invoked while the session shuts down
    pub fn on_shutdown(&self, hook: Arc<dyn ShutdownHook>) {
        self.hooks.lock().unwrap().push(hook);
    }

    /// Installs a provider for the network status diagnostic dump
    pub fn set_network_status_provider(
        &self,
        provider: impl Fn() -> String + Send + Sync + 'static,
    ) {
        *self.network_status.lock().unwrap() = Some(Box::new(provider));
    }

    /// Current network status line for diagnostic dumps, if a provider is set
    pub fn dump_network_status(&self) -> Option<String> {
        let provider = self.network_status.lock().unwrap();
        provider.as_ref().map(|p| p())
    }

    /// Shuts the session down: runs every shutdown hook, then waits for all
    /// monitors to arrive at the barrier
    ///
    /// Hooks run in registration order and exactly once; a second call only
    /// waits on the barrier.
    pub async fn shutdown(&self) {
        debug!("Session shutdown started");
        self.terminate();

        let hooks: Vec<_> = {
            let mut hooks = self.hooks.lock().unwrap();
            hooks.drain(..).collect()
        };

        for hook in hooks {
            hook.on_shutdown().await;
        }

        self.barrier.wait_all().await;
        debug!("Session shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct NeverProcessor;

    impl bosun_core::TaskProcessor for NeverProcessor {
        fn name(&self) -> &str {
            "never"
        }

        fn resume_or_die(
            &self,
            _task: &Arc<TaskRun>,
            _error: &anyhow::Error,
        ) -> Option<TaskFault> {
            None
        }

        fn finalize_task(&self, _task: &Arc<TaskRun>) -> Option<TaskFault> {
            None
        }
    }

    #[derive(Default)]
    struct Recorder {
        submits: AtomicUsize,
        starts: AtomicUsize,
        completes: AtomicUsize,
    }

    impl TaskEventListener for Recorder {
        fn on_task_submit(&self, _task: &Arc<TaskRun>) {
            self.submits.fetch_add(1, Ordering::SeqCst);
        }

        fn on_task_start(&self, _task: &Arc<TaskRun>) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_task_complete(&self, _task: &Arc<TaskRun>) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_task() -> Arc<TaskRun> {
        Arc::new(TaskRun::new("t", "true", Arc::new(NeverProcessor)))
    }

    #[test]
    fn test_listeners_receive_events() {
        let session = Session::new(SessionConfig::default());
        let recorder = Arc::new(Recorder::default());
        session.add_listener(recorder.clone());

        let task = test_task();
        session.notify_task_submit(&task);
        session.notify_task_start(&task);
        session.notify_task_complete(&task);
        session.notify_task_complete(&task);

        assert_eq!(recorder.submits.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.starts.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.completes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fault_aborts_and_keeps_first() {
        let session = Session::new(SessionConfig::default());
        assert!(!session.is_aborted());

        let task = test_task();
        session.fault(TaskFault::new(&task, "first"));
        session.fault(TaskFault::new(&task, "second"));

        assert!(session.is_aborted());
        assert_eq!(session.first_fault().unwrap().message, "first");
    }

    struct OrderHook {
        order: Arc<Mutex<Vec<&'static str>>>,
        tag: &'static str,
    }

    #[async_trait]
    impl ShutdownHook for OrderHook {
        async fn on_shutdown(&self) {
            self.order.lock().unwrap().push(self.tag);
        }
    }

    #[tokio::test]
    async fn test_shutdown_runs_hooks_in_order_once() {
        let session = Session::new(SessionConfig::default());
        let order = Arc::new(Mutex::new(Vec::new()));

        session.on_shutdown(Arc::new(OrderHook {
            order: order.clone(),
            tag: "first",
        }));
        session.on_shutdown(Arc::new(OrderHook {
            order: order.clone(),
            tag: "second",
        }));

        session.shutdown().await;
        assert!(session.is_terminated());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);

        session.shutdown().await;
        assert_eq!(order.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_network_status_provider() {
        let session = Session::new(SessionConfig::default());
        assert!(session.dump_network_status().is_none());

        session.set_network_status_provider(|| "2 channels open".to_string());
        assert_eq!(
            session.dump_network_status().as_deref(),
            Some("2 channels open")
        );
    }
}
