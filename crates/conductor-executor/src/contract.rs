//! The execution contract shared by every executor.

use async_trait::async_trait;
use conductor_core::{ExecutionContext, ExecutionMode, ProgressCallback, Result, Task, TaskResult};
use std::time::Duration;

/// Runs batches of independent tasks.
///
/// Implementations must uphold the same guarantees so callers can switch between
/// them through configuration alone:
///
/// - one [`TaskResult`] per task, in input order, whatever the completion order
/// - individual failures are captured in their result, never returned as `Err`
/// - [`ConductorError::AllTasksFailed`](conductor_core::ConductorError::AllTasksFailed)
///   is returned if and only if every task of a non-empty batch failed
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Executes `tasks` under contexts derived from `base`.
    ///
    /// # Errors
    /// Returns `AllTasksFailed`, carrying every result, when no task succeeded.
    async fn execute_tasks(
        &self,
        tasks: &[Task],
        base: &ExecutionContext,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<Vec<TaskResult>>;

    /// Whether this executor runs tasks sequentially or in parallel.
    fn execution_mode(&self) -> ExecutionMode;

    /// Stops accepting work and waits at most `timeout` for work in flight.
    ///
    /// Calling it more than once is a no-op.
    async fn shutdown(&self, timeout: Duration);
}
