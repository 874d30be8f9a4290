//! Countdown latch
//!
//! Lets the workflow layer block until a known number of tasks have reached
//! a terminal state. The monitor decrements the latch attached to a task
//! exactly once, whether the task completed or was killed during teardown.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// One-shot countdown synchronisation primitive
pub struct CountdownLatch {
    count: AtomicUsize,
    notify: Notify,
}

impl CountdownLatch {
    /// Creates a latch that releases after `count` decrements
    pub fn new(count: usize) -> Self {
        Self {
            count: AtomicUsize::new(count),
            notify: Notify::new(),
        }
    }

    /// Remaining decrements before the latch releases
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Decrements the latch, releasing all waiters on the last decrement
    ///
    /// Decrementing an already released latch has no effect.
    pub fn count_down(&self) {
        let mut current = self.count.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return;
            }
            match self.count.compare_exchange(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if current == 1 {
                        self.notify.notify_waiters();
                    }
                    return;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Waits until the latch has been fully counted down
    pub async fn wait(&self) {
        loop {
            if self.count.load(Ordering::Acquire) == 0 {
                return;
            }

            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            // A decrement may have landed between the check and enable
            if self.count.load(Ordering::Acquire) == 0 {
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
    async fn test_latch_releases_after_countdown() {
        let latch = Arc::new(CountdownLatch::new(2));

        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.wait().await })
        };

        latch.count_down();
        assert_eq!(latch.count(), 1);

        latch.count_down();
        assert_eq!(latch.count(), 0);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("latch released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_latch_zero_waits_return_immediately() {
        let latch = CountdownLatch::new(0);
        tokio::time::timeout(Duration::from_millis(100), latch.wait())
            .await
            .expect("released latch never blocks");
    }

    #[tokio::test]
    async fn test_latch_extra_countdown_is_ignored() {
        let latch = CountdownLatch::new(1);
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.count(), 0);
    }
}
