//! Error types for the scheduler crate.
//!
//! Environmental failures (worker spawn, poisoning) are reported as error
//! returns; programmer errors (driving a scheduler with an operation its
//! strategy does not support) panic and are never recovered.

use thiserror::Error;

/// Errors that can occur during scheduler operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// The background worker thread could not be spawned.
    #[error("failed to spawn background worker: {0}")]
    WorkerSpawn(String),

    /// A listener panic unwound the background worker; the scheduler no
    /// longer accepts work.
    #[error("background worker poisoned by a panicking listener")]
    WorkerPoisoned,
}

impl SchedulerError {
    /// Create a worker spawn error.
    #[must_use]
    pub fn worker_spawn(reason: impl Into<String>) -> Self {
        Self::WorkerSpawn(reason.into())
    }
}

/// A specialized `Result` type for scheduler operations.
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedulerError::worker_spawn("out of threads");
        assert!(err.to_string().contains("out of threads"));

        let err = SchedulerError::WorkerPoisoned;
        assert!(err.to_string().contains("poisoned"));
    }

    #[test]
    fn test_error_is_std_error() {
        let err = SchedulerError::WorkerPoisoned;
        let _: &dyn std::error::Error = &err;
    }
}
