//! Bosun Local
//!
//! Local process backend for the bosun task monitor: executes task scripts
//! as child processes on the host and drives their lifecycle through the
//! [`TaskHandler`](bosun_core::TaskHandler) interface.

pub mod error;
pub mod handler;

pub use error::LocalError;
pub use handler::LocalTaskHandler;
