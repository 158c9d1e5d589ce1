//! Backend and backend-selection seams.

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::result::TaskResult;
use crate::task::Task;
use async_trait::async_trait;
use std::sync::Arc;

/// Strategy that performs the actual work of a task.
///
/// Backends are opaque to executors: they may spawn processes, call remote
/// services or compute in-process, and may be slow or fail. An `Err` is turned
/// into a failed [`TaskResult`] by the executor.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend type name, as used in routing rules.
    fn name(&self) -> &str;

    /// Executes `task` inside `context`.
    ///
    /// # Errors
    /// Returns an error if the task could not be carried out.
    async fn execute(&self, task: &Task, context: &ExecutionContext) -> Result<TaskResult>;
}

/// Chooses the backend that should execute a task.
pub trait BackendSelector: Send + Sync {
    /// Selects a backend for `task` running in `context`.
    ///
    /// # Errors
    /// Returns an error if no backend can be provided.
    fn select_backend(&self, task: &Task, context: &ExecutionContext) -> Result<Arc<dyn Backend>>;
}

/// Selector that always hands out the same backend.
#[derive(Clone)]
pub struct SingleBackend {
    backend: Arc<dyn Backend>,
}

impl SingleBackend {
    /// Wraps `backend`.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

impl BackendSelector for SingleBackend {
    fn select_backend(&self, task: &Task, _context: &ExecutionContext) -> Result<Arc<dyn Backend>> {
        tracing::debug!(task_id = %task.id, backend = self.backend.name(), "Using fixed backend");
        Ok(Arc::clone(&self.backend))
    }
}
