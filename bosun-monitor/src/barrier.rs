//! Session barrier
//!
//! Rendezvous between the session and its monitors: the session does not
//! terminate until every registered monitor has arrived. Registration must
//! happen before a monitor's loops start, otherwise the session could
//! observe an unregistered monitor and tear down early.

use std::collections::HashSet;
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::debug;

/// Rendezvous releasing once every registered party has arrived
#[derive(Default)]
pub struct MonitorBarrier {
    registered: Mutex<HashSet<String>>,
    notify: Notify,
}

impl MonitorBarrier {
    /// Creates an empty barrier
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named party the barrier will wait for
    pub fn register(&self, name: impl Into<String>) {
        let name = name.into();
        debug!("Barrier registration: {}", name);
        self.registered.lock().unwrap().insert(name);
    }

    /// Marks a named party as arrived, releasing waiters when it is the last
    pub fn arrive(&self, name: &str) {
        let released = {
            let mut registered = self.registered.lock().unwrap();
            registered.remove(name) && registered.is_empty()
        };

        debug!("Barrier arrival: {}", name);
        if released {
            self.notify.notify_waiters();
        }
    }

    /// Number of registered parties that have not arrived yet
    pub fn outstanding(&self) -> usize {
        self.registered.lock().unwrap().len()
    }

    /// Waits until every registered party has arrived
    pub async fn wait_all(&self) {
        loop {
            if self.registered.lock().unwrap().is_empty() {
                return;
            }

            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            // the last arrival may have landed between the check and enable
            if self.registered.lock().unwrap().is_empty() {
                return;
            }

            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_barrier_releases_after_all_arrive() {
        let barrier = Arc::new(MonitorBarrier::new());
        barrier.register("local");
        barrier.register("grid");
        assert_eq!(barrier.outstanding(), 2);

        let waiter = {
            let barrier = barrier.clone();
            tokio::spawn(async move { barrier.wait_all().await })
        };

        barrier.arrive("local");
        assert_eq!(barrier.outstanding(), 1);

        barrier.arrive("grid");
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("barrier released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_barrier_never_blocks() {
        let barrier = MonitorBarrier::new();
        tokio::time::timeout(Duration::from_millis(100), barrier.wait_all())
            .await
            .expect("nothing registered");
    }

    #[tokio::test]
    async fn test_unknown_arrival_is_ignored() {
        let barrier = MonitorBarrier::new();
        barrier.register("local");
        barrier.arrive("grid");
        assert_eq!(barrier.outstanding(), 1);
    }
}
