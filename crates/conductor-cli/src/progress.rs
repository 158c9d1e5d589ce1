//! Progress reporting through `tracing`.

use conductor_core::{CallbackResult, ConductorError, ExecutionContext, ProgressCallback, Task, TaskResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Logs task starts and completions with a running count.
#[derive(Debug)]
pub struct LoggingProgress {
    total: usize,
    finished: AtomicUsize,
}

impl LoggingProgress {
    /// Create a reporter for a batch of `total` tasks
    pub fn new(total: usize) -> Self {
        Self {
            total,
            finished: AtomicUsize::new(0),
        }
    }

    /// Tasks that have finished so far, successfully or not
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::Relaxed)
    }

    fn tick(&self) -> usize {
        self.finished.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl ProgressCallback for LoggingProgress {
    fn on_task_start(&self, task: &Task, context: &ExecutionContext) -> CallbackResult {
        tracing::info!(
            task_id = %task.id,
            branch = %context.branch,
            working_dir = %context.working_dir.display(),
            "Task started"
        );
        Ok(())
    }

    fn on_task_complete(&self, result: &TaskResult) -> CallbackResult {
        let done = self.tick();
        if result.is_success() {
            tracing::info!(
                task_id = %result.task.id,
                duration_secs = result.duration_secs,
                "Task succeeded ({done}/{})",
                self.total
            );
        } else {
            tracing::warn!(
                task_id = %result.task.id,
                exit_code = result.exit_code,
                error = result.error_message.as_deref().unwrap_or_default(),
                "Task failed ({done}/{})",
                self.total
            );
        }
        Ok(())
    }

    fn on_task_error(&self, task: &Task, error: &ConductorError) -> CallbackResult {
        let done = self.tick();
        tracing::warn!(task_id = %task.id, error = %error, "Task not dispatched ({done}/{})", self.total);
        Ok(())
    }
}
