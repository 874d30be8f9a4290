//! Local process task handler
//!
//! Executes a task's script as a child process on the local host. A local
//! task is running as soon as the spawn returns, so the running transition
//! is reported on the first probe after submission; completion is probed
//! with a non-blocking wait.

use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::debug;

use bosun_core::{TaskHandler, TaskRun};

use crate::error::LocalError;

/// Drives one task as a `sh -c` child process
pub struct LocalTaskHandler {
    task: Arc<TaskRun>,

    /// The spawned child; present from successful submit until reaped
    child: Mutex<Option<Child>>,

    /// Whether the running transition has been reported
    reported_running: AtomicBool,

    /// Exit status recorded when the child is reaped
    exit: StdMutex<Option<ExitStatus>>,
}

impl LocalTaskHandler {
    /// Creates a handler for the given task
    pub fn new(task: Arc<TaskRun>) -> Arc<Self> {
        Arc::new(Self {
            task,
            child: Mutex::new(None),
            reported_running: AtomicBool::new(false),
            exit: StdMutex::new(None),
        })
    }

    /// Exit status of the child, once it has been reaped
    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.exit.lock().unwrap()
    }
}

#[async_trait]
impl TaskHandler for LocalTaskHandler {
    fn task(&self) -> &Arc<TaskRun> {
        &self.task
    }

    async fn submit(&self) -> Result<()> {
        debug!("Spawning local task: {}", self.task);

        let child = Command::new("sh")
            .arg("-c")
            .arg(&self.task.script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(LocalError::Spawn)?;

        *self.child.lock().await = Some(child);
        Ok(())
    }

    async fn check_if_running(&self) -> Result<bool> {
        if self.child.lock().await.is_none() {
            return Ok(false);
        }
        // a spawned child is running immediately; report the transition once
        Ok(!self.reported_running.swap(true, Ordering::AcqRel))
    }

    async fn check_if_completed(&self) -> Result<bool> {
        let mut child = self.child.lock().await;
        let Some(process) = child.as_mut() else {
            return Err(LocalError::NotSubmitted.into());
        };

        match process.try_wait().map_err(LocalError::Probe)? {
            Some(status) => {
                debug!("Local task {} exited with {}", self.task, status);
                *self.exit.lock().unwrap() = Some(status);
                *child = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn kill(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        if let Some(process) = child.as_mut() {
            debug!("Killing local task: {}", self.task);
            process.kill().await.map_err(LocalError::Kill)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bosun_core::{TaskFault, TaskProcessor};
    use std::time::Duration;

    struct NoRetryProcessor;

    impl TaskProcessor for NoRetryProcessor {
        fn name(&self) -> &str {
            "no-retry"
        }

        fn resume_or_die(&self, task: &Arc<TaskRun>, error: &anyhow::Error) -> Option<TaskFault> {
            Some(TaskFault::new(task, error.to_string()))
        }

        fn finalize_task(&self, _task: &Arc<TaskRun>) -> Option<TaskFault> {
            None
        }
    }

    fn handler_for(script: &str) -> Arc<LocalTaskHandler> {
        let task = Arc::new(TaskRun::new("local-test", script, Arc::new(NoRetryProcessor)));
        LocalTaskHandler::new(task)
    }

    async fn wait_completed(handler: &LocalTaskHandler) -> bool {
        for _ in 0..100 {
            if handler.check_if_completed().await.unwrap() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_successful_script_completes() {
        let handler = handler_for("exit 0");
        handler.submit().await.unwrap();

        assert!(handler.check_if_running().await.unwrap());
        assert!(
            !handler.check_if_running().await.unwrap(),
            "the running transition is reported once"
        );

        assert!(wait_completed(&handler).await);
        assert!(handler.exit_status().unwrap().success());
    }

    #[tokio::test]
    async fn test_failing_script_reports_exit_code() {
        let handler = handler_for("exit 3");
        handler.submit().await.unwrap();

        assert!(wait_completed(&handler).await);
        let status = handler.exit_status().unwrap();
        assert!(!status.success());
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_kill_terminates_the_child() {
        let handler = handler_for("sleep 30");
        handler.submit().await.unwrap();

        handler.kill().await.unwrap();

        assert!(wait_completed(&handler).await);
        assert!(!handler.exit_status().unwrap().success());
    }

    #[tokio::test]
    async fn test_probe_before_submit_is_an_error() {
        let handler = handler_for("exit 0");
        assert!(handler.check_if_completed().await.is_err());
        assert!(!handler.check_if_running().await.unwrap());
    }

    #[tokio::test]
    async fn test_kill_before_submit_is_a_noop() {
        let handler = handler_for("exit 0");
        assert!(handler.kill().await.is_ok());
    }
}
