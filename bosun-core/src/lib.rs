//! Bosun Core
//!
//! Core types and abstractions for the bosun task execution system.
//!
//! This crate contains:
//! - Task domain types: `TaskRun`, `TaskFault`, `TaskSummary`
//! - Backend-facing traits: `TaskHandler`, `TaskProcessor`, batch capabilities
//! - Coordination primitives shared with backends: `CountdownLatch`, events

pub mod batch;
pub mod events;
pub mod handler;
pub mod latch;
pub mod processor;
pub mod task;

pub use batch::{BatchCleanup, BatchContext, BatchHandler, BatchKiller, GridHandler, RemoteState};
pub use events::TaskEventListener;
pub use handler::TaskHandler;
pub use latch::CountdownLatch;
pub use processor::{TaskFault, TaskProcessor};
pub use task::{TaskRun, TaskSummary};
