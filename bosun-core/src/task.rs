//! Task domain types
//!
//! A [`TaskRun`] is one logical unit of work produced by the workflow layer.
//! It carries the backend payload (the script to execute), a back-reference
//! to the processor that owns its fault policy, and an optional completion
//! latch the workflow layer can wait on.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::latch::CountdownLatch;
use crate::processor::TaskProcessor;

/// One unit of work to be dispatched to a backend
///
/// Created by the workflow layer, shared by reference between the monitor's
/// queues and the handler driving it. The monitor never duplicates a task.
pub struct TaskRun {
    /// Unique identifier for this task
    pub id: Uuid,

    /// Human-readable task name used in log lines
    pub name: String,

    /// Backend payload (e.g. the shell script a local handler executes)
    pub script: String,

    /// When the task was created
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Processor owning the fault-handling policy for this task
    processor: Arc<dyn TaskProcessor>,

    /// Optional latch decremented when the task reaches a terminal state
    latch: Option<Arc<CountdownLatch>>,

    /// Set when the task is torn down before completing
    aborted: AtomicBool,
}

impl TaskRun {
    /// Creates a new task run
    pub fn new(
        name: impl Into<String>,
        script: impl Into<String>,
        processor: Arc<dyn TaskProcessor>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            script: script.into(),
            created_at: chrono::Utc::now(),
            processor,
            latch: None,
            aborted: AtomicBool::new(false),
        }
    }

    /// Attaches a completion latch, decremented once when the task terminates
    pub fn with_latch(mut self, latch: Arc<CountdownLatch>) -> Self {
        self.latch = Some(latch);
        self
    }

    /// The processor owning this task's fault policy
    pub fn processor(&self) -> &Arc<dyn TaskProcessor> {
        &self.processor
    }

    /// The completion latch, if one was attached
    pub fn latch(&self) -> Option<&Arc<CountdownLatch>> {
        self.latch.as_ref()
    }

    /// Marks the task as aborted (torn down before completing)
    pub fn mark_aborted(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    /// Whether the task was aborted
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Serializable projection of this task for diagnostic dumps
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id,
            name: self.name.clone(),
            aborted: self.is_aborted(),
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for TaskRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRun")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

impl fmt::Display for TaskRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)
    }
}

/// Serializable task projection used in queue dumps
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub id: Uuid,
    pub name: String,
    pub aborted: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::TaskFault;

    struct NoopProcessor;

    impl TaskProcessor for NoopProcessor {
        fn name(&self) -> &str {
            "noop"
        }

        fn resume_or_die(&self, _task: &Arc<TaskRun>, _error: &anyhow::Error) -> Option<TaskFault> {
            None
        }

        fn finalize_task(&self, _task: &Arc<TaskRun>) -> Option<TaskFault> {
            None
        }
    }

    #[test]
    fn test_task_run_abort_flag() {
        let task = TaskRun::new("align", "echo align", Arc::new(NoopProcessor));
        assert!(!task.is_aborted());

        task.mark_aborted();
        assert!(task.is_aborted());
    }

    #[test]
    fn test_task_run_summary() {
        let task = TaskRun::new("align", "echo align", Arc::new(NoopProcessor));
        let summary = task.summary();

        assert_eq!(summary.id, task.id);
        assert_eq!(summary.name, "align");
        assert!(!summary.aborted);
    }

    #[test]
    fn test_task_run_with_latch() {
        let latch = Arc::new(CountdownLatch::new(1));
        let task = TaskRun::new("align", "echo align", Arc::new(NoopProcessor)).with_latch(latch);

        assert!(task.latch().is_some());
    }
}
