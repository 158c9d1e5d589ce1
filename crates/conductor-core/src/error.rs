//! Error types for task execution and backend routing.

use crate::result::TaskResult;
use std::io;
use std::path::PathBuf;
use std::result::Result as StdResult;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using `ConductorError`.
pub type Result<T> = StdResult<T, ConductorError>;

/// Errors raised while configuring executors, routing tasks, or running batches.
#[derive(Debug, Error)]
pub enum ConductorError {
    /// Invalid or unusable configuration, surfaced before any task is submitted
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every task of the batch failed
    #[error("All {} tasks in the batch failed", .results.len())]
    AllTasksFailed {
        /// Results for every task, in input order
        results: Vec<TaskResult>,
    },

    /// Task identifier cannot be used as an isolated path component
    #[error("Invalid task id {0:?}: must be a non-empty single path component")]
    InvalidTaskId(String),

    /// Creating an isolated directory failed
    #[error("Failed to create isolated directory {path}: {source}")]
    Isolation {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// A backend instance could not be constructed
    #[error("Failed to construct backend '{backend_type}': {reason}")]
    BackendConstruction {
        /// Backend type that failed
        backend_type: String,
        /// Why construction failed
        reason: String,
    },

    /// Backend reported a failure while executing a task
    #[error("Backend failed: {0}")]
    Backend(String),

    /// Task did not finish within the configured timeout
    #[error("Task timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// Executor no longer accepts work
    #[error("Executor has been shut down")]
    ExecutorShutDown,
}

impl ConductorError {
    /// Checks if this error is a configuration problem (fatal at construction time).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Results attached to an aggregate failure, if any.
    pub fn results(&self) -> Option<&[TaskResult]> {
        match self {
            Self::AllTasksFailed { results } => Some(results),
            _ => None,
        }
    }

    /// Consumes the error, returning the attached results of an aggregate failure.
    pub fn into_results(self) -> Option<Vec<TaskResult>> {
        match self {
            Self::AllTasksFailed { results } => Some(results),
            _ => None,
        }
    }
}
