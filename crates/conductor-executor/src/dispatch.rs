//! Steps shared by all executors: preparing a task, invoking its backend,
//! notifying progress callbacks and judging the batch.

use conductor_core::{
    Backend, BackendSelector, CallbackResult, ConductorError, ExecutionContext, ExecutionMode,
    IsolationLevel, ProgressCallback, Result, Task, TaskResult, derive_isolated_context,
};
use futures::FutureExt as _;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::spawn_blocking;
use tracing::Span;

/// A task's isolated context and the backend selected for it
pub(crate) type Prepared = (ExecutionContext, Arc<dyn Backend>);

/// Derives the task's context and selects its backend.
///
/// Runs on the blocking pool: isolation creates directories and selection may
/// construct a backend synchronously.
///
/// # Errors
/// Returns an error if isolation or backend selection fails.
pub(crate) async fn prepare(
    task: &Task,
    base: &ExecutionContext,
    isolation: IsolationLevel,
    selector: &Arc<dyn BackendSelector>,
) -> Result<Prepared> {
    let task = task.clone();
    let base = base.clone();
    let selector = Arc::clone(selector);
    let span = Span::current();

    spawn_blocking(move || {
        span.in_scope(|| -> Result<Prepared> {
            let context = derive_isolated_context(&base, &task.id, isolation)?;
            let backend = selector.select_backend(&task, &context)?;
            Ok((context, backend))
        })
    })
    .await
    .unwrap_or_else(|join_error| {
        Err(ConductorError::Backend(format!(
            "Task preparation panicked: {join_error}"
        )))
    })
}

/// Runs `task` on `backend`, turning backend errors and panics into failed results.
pub(crate) async fn invoke(
    backend: &dyn Backend,
    task: &Task,
    context: &ExecutionContext,
) -> TaskResult {
    let started = Instant::now();
    match AssertUnwindSafe(backend.execute(task, context))
        .catch_unwind()
        .await
    {
        Ok(Ok(result)) => result.normalized(started.elapsed()),
        Ok(Err(error)) => {
            tracing::warn!(task_id = %task.id, backend = backend.name(), error = %error, "Task failed");
            TaskResult::failed(task.clone(), error.to_string(), started.elapsed())
        }
        Err(_panic) => {
            tracing::error!(task_id = %task.id, backend = backend.name(), "Backend panicked");
            TaskResult::failed(
                task.clone(),
                format!("Backend '{}' panicked", backend.name()),
                started.elapsed(),
            )
        }
    }
}

/// Logs a configuration error that ends the batch before it completes.
pub(crate) fn abort_batch(task: &Task, error: ConductorError) -> ConductorError {
    tracing::error!(task_id = %task.id, error = %error, "Configuration error, aborting batch");
    error
}

/// Fires progress hooks, isolating the batch from callback errors and panics.
#[derive(Clone, Copy)]
pub(crate) struct Notifier<'callback> {
    callback: Option<&'callback dyn ProgressCallback>,
}

impl<'callback> Notifier<'callback> {
    pub(crate) fn new(callback: Option<&'callback dyn ProgressCallback>) -> Self {
        Self { callback }
    }

    pub(crate) fn started(self, task: &Task, context: &ExecutionContext) {
        if let Some(callback) = self.callback {
            guard("on_task_start", task, || callback.on_task_start(task, context));
        }
    }

    pub(crate) fn completed(self, result: &TaskResult) {
        if let Some(callback) = self.callback {
            guard("on_task_complete", &result.task, || {
                callback.on_task_complete(result)
            });
        }
    }

    pub(crate) fn failed(self, task: &Task, error: &ConductorError) {
        if let Some(callback) = self.callback {
            guard("on_task_error", task, || callback.on_task_error(task, error));
        }
    }
}

fn guard(hook: &'static str, task: &Task, call: impl FnOnce() -> CallbackResult) {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            tracing::warn!(hook, task_id = %task.id, error = %error, "Progress callback failed");
        }
        Err(_panic) => {
            tracing::warn!(hook, task_id = %task.id, "Progress callback panicked");
        }
    }
}

/// Records a dispatch failure: notifies the error hook and returns the failed result.
pub(crate) fn dispatch_failure(
    notifier: Notifier<'_>,
    task: &Task,
    error: &ConductorError,
) -> TaskResult {
    tracing::warn!(task_id = %task.id, error = %error, "Task dispatch failed");
    notifier.failed(task, error);
    TaskResult::failed(task.clone(), error.to_string(), Duration::ZERO)
}

/// Returns the results, or `AllTasksFailed` when no task of a non-empty batch succeeded.
///
/// # Errors
/// Returns `AllTasksFailed` carrying every result when all tasks failed.
pub(crate) fn finish_batch(mode: ExecutionMode, results: Vec<TaskResult>) -> Result<Vec<TaskResult>> {
    let failed = results.iter().filter(|result| !result.is_success()).count();
    tracing::info!(
        mode = %mode,
        total = results.len(),
        succeeded = results.len() - failed,
        failed,
        "Batch finished"
    );

    if !results.is_empty() && failed == results.len() {
        return Err(ConductorError::AllTasksFailed { results });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct PanickingBackend;

    #[async_trait]
    impl Backend for PanickingBackend {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn execute(&self, _task: &Task, _context: &ExecutionContext) -> Result<TaskResult> {
            panic!("backend bug");
        }
    }

    #[tokio::test]
    async fn test_invoke_captures_backend_panic() {
        let task = Task::new("t1", "noop");
        let context = ExecutionContext::new("demo", ".", "main", ".state");

        let result = invoke(&PanickingBackend, &task, &context).await;

        assert!(!result.is_success());
        assert_eq!(
            result.error_message.as_deref(),
            Some("Backend 'panicking' panicked")
        );
    }

    struct PanickingCallback;

    impl ProgressCallback for PanickingCallback {
        fn on_task_start(&self, _task: &Task, _context: &ExecutionContext) -> CallbackResult {
            panic!("callback bug");
        }

        fn on_task_complete(&self, _result: &TaskResult) -> CallbackResult {
            Err("disk full".into())
        }
    }

    #[test]
    fn test_notifier_swallows_callback_failures() {
        let callback = PanickingCallback;
        let notifier = Notifier::new(Some(&callback));
        let task = Task::new("t1", "noop");
        let context = ExecutionContext::new("demo", ".", "main", ".state");

        notifier.started(&task, &context);
        notifier.completed(&TaskResult::success(task.clone(), Duration::ZERO));
        notifier.failed(&task, &ConductorError::ExecutorShutDown);
    }

    #[test]
    fn test_finish_batch_partial_failure_returns_results() {
        let results = vec![
            TaskResult::success(Task::new("a", "ok"), Duration::ZERO),
            TaskResult::failed(Task::new("b", "bad"), "boom", Duration::ZERO),
        ];
        let returned = finish_batch(ExecutionMode::Parallel, results)
            .unwrap_or_else(|error| panic!("unexpected error: {error}"));
        assert_eq!(returned.len(), 2);
    }

    #[test]
    fn test_finish_batch_total_failure_is_aggregate() {
        let results = vec![TaskResult::failed(Task::new("a", "bad"), "boom", Duration::ZERO)];
        let error = finish_batch(ExecutionMode::Sequential, results).err();
        assert_eq!(
            error.as_ref().and_then(ConductorError::results).map(<[TaskResult]>::len),
            Some(1)
        );
    }

    #[test]
    fn test_finish_batch_empty_is_ok() {
        let returned = finish_batch(ExecutionMode::Parallel, Vec::new())
            .unwrap_or_else(|error| panic!("unexpected error: {error}"));
        assert!(returned.is_empty());
    }
}
