//! Bosun Monitor
//!
//! Bounded-concurrency task polling monitor: the coordination engine
//! between a workflow layer producing logical task descriptions and the
//! backends that physically execute them.
//!
//! Architecture:
//! - Session: run-wide lifecycle flags, fault record, barrier, events
//! - Configuration: per-monitor capacity, polling cadence, dump spacing
//! - Monitor: the two queues, the submitter and poller loops, cleanup
//! - Throttle: rate-limited diagnostic dumps
//!
//! Producers call [`TaskMonitor::schedule`]; the submitter promotes handlers
//! into the bounded running queue and dispatches them, the poller drives
//! each one to a terminal state, and session shutdown drains whatever is
//! still in flight.

pub mod barrier;
pub mod config;
pub mod monitor;
pub mod session;
pub mod throttle;

pub use barrier::MonitorBarrier;
pub use config::{MonitorConfig, SlotLimit};
pub use monitor::{SubmitPolicy, TaskMonitor};
pub use session::{ExecutorSettings, Session, SessionConfig, ShutdownHook};
pub use throttle::RateGate;
