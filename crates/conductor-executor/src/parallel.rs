//! Executor running a batch on a bounded pool of workers.

use crate::contract::TaskExecutor;
use crate::dispatch::{Notifier, abort_batch, dispatch_failure, finish_batch, invoke, prepare};
use async_trait::async_trait;
use conductor_core::{
    Backend, BackendSelector, ConductorError, ExecutionConfig, ExecutionContext, ExecutionMode,
    IsolationLevel, ProgressCallback, Result, Task, TaskResult, validate_max_workers,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinSet, spawn};
use tokio::time::timeout;
use tracing::Instrument as _;

/// Default per-task timeout (one hour).
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(3600);

/// Parallel task executor with a bounded worker pool.
///
/// Every task gets its own isolated context and is handed to a worker slot; results
/// are collected as they complete and reassembled in input order. A task that does
/// not finish within the timeout is reported as failed. Its backend call keeps
/// running in the background and keeps its slot until it returns, so at most
/// `max_workers` backend calls are ever in flight.
pub struct ParallelExecutor {
    selector: Arc<dyn BackendSelector>,
    max_workers: usize,
    timeout: Duration,
    isolation: IsolationLevel,
    workers: Arc<Semaphore>,
}

impl ParallelExecutor {
    /// Create a parallel executor with `max_workers` slots and a per-task `timeout`.
    ///
    /// Tasks get [`IsolationLevel::Full`] unless [`with_isolation`](Self::with_isolation)
    /// says otherwise.
    ///
    /// # Errors
    /// Returns a configuration error if `max_workers` is outside 1..=32 or `timeout` is zero.
    pub fn new(
        selector: Arc<dyn BackendSelector>,
        max_workers: usize,
        timeout: Duration,
    ) -> Result<Self> {
        validate_max_workers(max_workers)?;
        if timeout.is_zero() {
            return Err(ConductorError::Config(
                "timeout must be a positive duration".to_owned(),
            ));
        }

        tracing::info!(
            max_workers,
            timeout_secs = timeout.as_secs_f64(),
            "Parallel executor initialized"
        );

        Ok(Self {
            selector,
            max_workers,
            timeout,
            isolation: IsolationLevel::Full,
            workers: Arc::new(Semaphore::new(max_workers)),
        })
    }

    /// Create a parallel executor from validated execution settings.
    ///
    /// # Errors
    /// Returns a configuration error if the settings are invalid.
    pub fn from_config(config: &ExecutionConfig, selector: Arc<dyn BackendSelector>) -> Result<Self> {
        let timeout = config.timeout()?;
        Ok(Self::new(selector, config.max_workers, timeout)?.with_isolation(config.isolation))
    }

    /// Isolate each task's context at `level`
    #[must_use]
    pub fn with_isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = level;
        self
    }

    /// Worker pool size
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Per-task timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Isolation applied to task contexts
    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// Whether the pool has been shut down
    pub fn is_shut_down(&self) -> bool {
        self.workers.is_closed()
    }

    /// Waits for a worker slot, then runs the task under the timeout.
    ///
    /// The backend call runs as its own tokio task holding the slot. A timeout only
    /// stops the wait: the call is detached and frees the slot when it returns.
    async fn run_worker(
        workers: Arc<Semaphore>,
        backend: Arc<dyn Backend>,
        task: Task,
        context: ExecutionContext,
        task_timeout: Duration,
    ) -> TaskResult {
        let Ok(permit) = workers.acquire_owned().await else {
            return TaskResult::failed(
                task,
                ConductorError::ExecutorShutDown.to_string(),
                Duration::ZERO,
            );
        };

        let started = Instant::now();
        let invocation = {
            let task = task.clone();
            spawn(
                async move {
                    let result = invoke(backend.as_ref(), &task, &context).await;
                    drop(permit);
                    result
                }
                .in_current_span(),
            )
        };

        match timeout(task_timeout, invocation).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => TaskResult::failed(
                task,
                format!("Backend panicked: {join_error}"),
                started.elapsed(),
            ),
            Err(_elapsed) => {
                tracing::warn!(
                    task_id = %task.id,
                    timeout_secs = task_timeout.as_secs_f64(),
                    "Task timed out, its backend call keeps the worker slot until it returns"
                );
                TaskResult::timed_out(task, task_timeout, started.elapsed())
            }
        }
    }
}

#[async_trait]
impl TaskExecutor for ParallelExecutor {
    async fn execute_tasks(
        &self,
        tasks: &[Task],
        base: &ExecutionContext,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<Vec<TaskResult>> {
        let notifier = Notifier::new(progress);
        let mut slots: Vec<Option<TaskResult>> = tasks.iter().map(|_| None).collect();
        let mut positions = HashMap::with_capacity(tasks.len());
        let mut join_set = JoinSet::new();

        tracing::info!(
            tasks = tasks.len(),
            max_workers = self.max_workers,
            isolation = %self.isolation,
            "Dispatching batch"
        );

        for (index, task) in tasks.iter().enumerate() {
            let span = tracing::info_span!("task", task_id = %task.id, mode = %ExecutionMode::Parallel);
            let prepared = prepare(task, base, self.isolation, &self.selector)
                .instrument(span.clone())
                .await;

            let (context, backend) = match prepared {
                Ok(prepared) => prepared,
                Err(error) if error.is_configuration() => {
                    join_set.abort_all();
                    return Err(abort_batch(task, error));
                }
                Err(error) => {
                    slots[index] = Some(dispatch_failure(notifier, task, &error));
                    continue;
                }
            };

            notifier.started(task, &context);
            let worker = Self::run_worker(
                Arc::clone(&self.workers),
                backend,
                task.clone(),
                context,
                self.timeout,
            );
            let handle = join_set.spawn(worker.instrument(span));
            positions.insert(handle.id(), index);
        }

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    let Some(index) = positions.remove(&id) else {
                        continue;
                    };
                    notifier.completed(&result);
                    slots[index] = Some(result);
                }
                Err(join_error) => {
                    let Some(index) = positions.remove(&join_error.id()) else {
                        continue;
                    };
                    let error = ConductorError::Backend(format!("Worker panicked: {join_error}"));
                    slots[index] = Some(dispatch_failure(notifier, &tasks[index], &error));
                }
            }
        }

        let results = slots
            .into_iter()
            .zip(tasks)
            .map(|(slot, task)| {
                slot.unwrap_or_else(|| {
                    TaskResult::failed(task.clone(), "Task produced no result", Duration::ZERO)
                })
            })
            .collect();

        finish_batch(ExecutionMode::Parallel, results)
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Parallel
    }

    async fn shutdown(&self, wait: Duration) {
        if self.workers.is_closed() {
            tracing::debug!("Parallel executor already shut down");
            return;
        }

        tracing::info!(timeout_secs = wait.as_secs_f64(), "Parallel executor shutting down");
        let permits = u32::try_from(self.max_workers).unwrap_or(u32::MAX);
        let drained = timeout(wait, self.workers.acquire_many(permits)).await;
        self.workers.close();

        match drained {
            Ok(Ok(permit)) => {
                drop(permit);
                tracing::info!("Parallel executor shut down, all workers idle");
            }
            Ok(Err(_closed)) => tracing::info!("Parallel executor shut down concurrently"),
            Err(_elapsed) => {
                tracing::warn!("Parallel executor shut down with work still in flight");
            }
        }
    }
}
