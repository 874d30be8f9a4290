//! Monitor configuration
//!
//! Defines the tunables of one task monitor: slot capacity, polling cadence,
//! and diagnostic dump spacing. Values can be set directly or resolved from
//! the session's per-executor settings.

use std::fmt;
use std::time::Duration;

use crate::session::Session;

/// Default polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default minimum spacing between diagnostic queue dumps
pub const DEFAULT_DUMP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default number of execution slots
pub const DEFAULT_CAPACITY: usize = 100;

/// Maximum number of concurrently running tasks
///
/// "No limit" is an explicit variant, never a zero sentinel; a zero slot
/// count is rejected by [`MonitorConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLimit {
    /// No bound on concurrent running tasks
    Unlimited,
    /// At most this many concurrent running tasks
    Max(usize),
}

impl SlotLimit {
    /// Whether one more task may run given the current running count
    pub fn admits(&self, running: usize) -> bool {
        match self {
            SlotLimit::Unlimited => true,
            SlotLimit::Max(capacity) => running < *capacity,
        }
    }
}

impl fmt::Display for SlotLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotLimit::Unlimited => write!(f, "unlimited"),
            SlotLimit::Max(capacity) => write!(f, "{}", capacity),
        }
    }
}

/// Configuration for one task monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Executor identifier used in log lines
    pub name: String,

    /// Maximum number of concurrently running tasks
    pub capacity: SlotLimit,

    /// Wall-clock cadence of the poller
    pub poll_interval: Duration,

    /// Minimum spacing between diagnostic dumps of the queues
    pub dump_interval: Duration,
}

impl MonitorConfig {
    /// Creates a configuration with defaults for the named executor
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: SlotLimit::Max(DEFAULT_CAPACITY),
            poll_interval: DEFAULT_POLL_INTERVAL,
            dump_interval: DEFAULT_DUMP_INTERVAL,
        }
    }

    /// Resolves the configuration for the named executor from session settings
    ///
    /// Session values override the defaults; anything the session does not
    /// define keeps its default.
    pub fn from_session(name: impl Into<String>, session: &Session) -> Self {
        let name = name.into();
        let settings = session.config();

        let mut config = Self::new(name.clone());
        if let Some(capacity) = settings.queue_size(&name) {
            config.capacity = capacity;
        }
        if let Some(poll_interval) = settings.poll_interval(&name) {
            config.poll_interval = poll_interval;
        }
        if let Some(dump_interval) = settings.monitor_dump_interval(&name) {
            config.dump_interval = dump_interval;
        }
        config
    }

    /// Overrides the slot capacity
    pub fn with_capacity(mut self, capacity: SlotLimit) -> Self {
        self.capacity = capacity;
        self
    }

    /// Overrides the polling cadence
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Overrides the diagnostic dump spacing
    pub fn with_dump_interval(mut self, dump_interval: Duration) -> Self {
        self.dump_interval = dump_interval;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("monitor name cannot be empty");
        }

        if self.capacity == SlotLimit::Max(0) {
            anyhow::bail!(
                "slot capacity must be greater than 0; use SlotLimit::Unlimited for no limit"
            );
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.dump_interval.is_zero() {
            anyhow::bail!("dump_interval must be greater than 0");
        }

        Ok(())
    }
}
