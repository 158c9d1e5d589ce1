//! Executor running a batch one task at a time.

use crate::contract::TaskExecutor;
use crate::dispatch::{Notifier, abort_batch, dispatch_failure, finish_batch, invoke, prepare};
use async_trait::async_trait;
use conductor_core::{
    Backend, BackendSelector, ExecutionContext, ExecutionMode, IsolationLevel, ProgressCallback,
    Result, SingleBackend, Task, TaskResult,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument as _;

/// Runs tasks one after another on the caller's task.
///
/// Without a router every task goes to the fixed default backend. Contexts are not
/// isolated unless [`with_isolation`](Self::with_isolation) asks for it.
pub struct SequentialExecutor {
    selector: Arc<dyn BackendSelector>,
    isolation: IsolationLevel,
}

impl SequentialExecutor {
    /// Create a sequential executor sending every task to `default_backend`
    pub fn new(default_backend: Arc<dyn Backend>) -> Self {
        tracing::info!(
            backend = default_backend.name(),
            "Sequential executor initialized"
        );
        Self {
            selector: Arc::new(SingleBackend::new(default_backend)),
            isolation: IsolationLevel::None,
        }
    }

    /// Create a sequential executor choosing each task's backend through `router`
    pub fn with_router(router: Arc<dyn BackendSelector>) -> Self {
        tracing::info!("Sequential executor initialized with router");
        Self {
            selector: router,
            isolation: IsolationLevel::None,
        }
    }

    /// Isolate each task's context at `level`
    #[must_use]
    pub fn with_isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = level;
        self
    }

    /// Isolation applied to task contexts
    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }
}

#[async_trait]
impl TaskExecutor for SequentialExecutor {
    async fn execute_tasks(
        &self,
        tasks: &[Task],
        base: &ExecutionContext,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<Vec<TaskResult>> {
        let notifier = Notifier::new(progress);
        let mut results = Vec::with_capacity(tasks.len());

        for task in tasks {
            let span = tracing::info_span!("task", task_id = %task.id, mode = %ExecutionMode::Sequential);
            let prepared = prepare(task, base, self.isolation, &self.selector)
                .instrument(span.clone())
                .await;

            let (context, backend) = match prepared {
                Ok(prepared) => prepared,
                Err(error) if error.is_configuration() => return Err(abort_batch(task, error)),
                Err(error) => {
                    results.push(dispatch_failure(notifier, task, &error));
                    continue;
                }
            };

            notifier.started(task, &context);
            let result = invoke(backend.as_ref(), task, &context)
                .instrument(span)
                .await;
            notifier.completed(&result);
            results.push(result);
        }

        finish_batch(ExecutionMode::Sequential, results)
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Sequential
    }

    async fn shutdown(&self, _timeout: Duration) {
        tracing::debug!("Sequential executor holds no pooled resources");
    }
}
