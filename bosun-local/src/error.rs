//! Error types for the local backend

use thiserror::Error;

/// Errors raised while driving a local process task
#[derive(Debug, Error)]
pub enum LocalError {
    /// The child process could not be spawned
    #[error("failed to spawn local task: {0}")]
    Spawn(#[source] std::io::Error),

    /// The child process could not be killed
    #[error("failed to kill local task: {0}")]
    Kill(#[source] std::io::Error),

    /// The child's exit state could not be read
    #[error("failed to probe local task: {0}")]
    Probe(#[source] std::io::Error),

    /// A lifecycle operation was invoked before submission
    #[error("local task was not submitted")]
    NotSubmitted,
}
