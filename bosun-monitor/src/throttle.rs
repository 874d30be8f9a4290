//! Rate-limited emission
//!
//! Diagnostic queue dumps are observability, not control: they must never
//! flood the log under sustained starvation. A [`RateGate`] admits at most
//! one emission per interval.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Admits an action at most once per interval
pub struct RateGate {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateGate {
    /// Creates a gate with the given minimum spacing
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// The minimum spacing between admitted emissions
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true if an emission is admitted now
    ///
    /// The first call is always admitted; subsequent calls are admitted
    /// once the interval has elapsed since the last admission.
    pub fn try_emit(&self) -> bool {
        let mut last = self.last.lock().unwrap();
        let now = Instant::now();

        match *last {
            Some(admitted) if now.duration_since(admitted) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}
