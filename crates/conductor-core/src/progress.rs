//! Progress observation hooks fired by executors around each task.

use crate::context::ExecutionContext;
use crate::error::ConductorError;
use crate::result::TaskResult;
use crate::task::Task;
use std::error::Error as StdError;
use std::result::Result as StdResult;

/// Outcome of a progress hook. Errors are logged by the executor and otherwise ignored.
pub type CallbackResult = StdResult<(), Box<dyn StdError + Send + Sync>>;

/// Observer notified at task boundaries.
///
/// Every hook defaults to a no-op, so implementors override only what they need.
/// Executors call `on_task_start` before dispatching a task and then exactly one
/// of `on_task_complete` (a result was produced, successful or not) or
/// `on_task_error` (dispatch itself failed).
pub trait ProgressCallback: Send + Sync {
    /// Called before the task is handed to its backend.
    ///
    /// # Errors
    /// Any error is logged and discarded by the executor.
    fn on_task_start(&self, _task: &Task, _context: &ExecutionContext) -> CallbackResult {
        Ok(())
    }

    /// Called once the task produced a result, including captured failures.
    ///
    /// # Errors
    /// Any error is logged and discarded by the executor.
    fn on_task_complete(&self, _result: &TaskResult) -> CallbackResult {
        Ok(())
    }

    /// Called when dispatching the task failed before a backend could run it.
    ///
    /// # Errors
    /// Any error is logged and discarded by the executor.
    fn on_task_error(&self, _task: &Task, _error: &ConductorError) -> CallbackResult {
        Ok(())
    }
}

/// Callback that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {}
