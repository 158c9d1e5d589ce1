//! Integration tests for the sequential and parallel executors
#![cfg(test)]
#![allow(
    clippy::expect_used,
    clippy::tests_outside_test_module,
    reason = "Test code prioritizes clarity over efficiency"
)]

use async_trait::async_trait;
use conductor_core::{
    Backend, BackendSelector, CallbackResult, ConductorError, ExecutionConfig, ExecutionContext,
    IsolationLevel, ProgressCallback, Result, RoutingConfig, SingleBackend, TIMEOUT_EXIT_CODE,
    Task, TaskResult,
};
use conductor_executor::{ParallelExecutor, SequentialExecutor, TaskExecutor, build_executor};
use conductor_routing::{BackendRegistry, BackendRouter};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Backend driven by the task description: `sleep <ms>`, `fail`, `panic`, or anything else to succeed.
#[derive(Default)]
struct ScriptedBackend {
    running: AtomicUsize,
    peak: AtomicUsize,
    contexts: Mutex<Vec<ExecutionContext>>,
}

impl ScriptedBackend {
    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(&self, task: &Task, context: &ExecutionContext) -> Result<TaskResult> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.contexts.lock().expect("lock").push(context.clone());

        let mut words = task.description.split_whitespace();
        let outcome = match (words.next(), words.next()) {
            (Some("sleep"), Some(millis)) => {
                let millis = millis.parse().expect("sleep takes milliseconds");
                sleep(Duration::from_millis(millis)).await;
                Ok(TaskResult::success(task.clone(), Duration::from_millis(millis)))
            }
            (Some("fail"), _) => Err(ConductorError::Backend(format!("{} broke", task.id))),
            (Some("exit"), _) => Ok(TaskResult::success(task.clone(), Duration::ZERO).with_exit_code(3)),
            (Some("panic"), _) => panic!("backend bug"),
            _ => Ok(TaskResult::success(task.clone(), Duration::ZERO)),
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

#[derive(Default)]
struct CountingCallback {
    started: AtomicUsize,
    completed: AtomicUsize,
    errors: AtomicUsize,
}

impl CountingCallback {
    fn counts(&self) -> (usize, usize, usize) {
        (
            self.started.load(Ordering::SeqCst),
            self.completed.load(Ordering::SeqCst),
            self.errors.load(Ordering::SeqCst),
        )
    }
}

impl ProgressCallback for CountingCallback {
    fn on_task_start(&self, _task: &Task, _context: &ExecutionContext) -> CallbackResult {
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_task_complete(&self, _result: &TaskResult) -> CallbackResult {
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_task_error(&self, _task: &Task, _error: &ConductorError) -> CallbackResult {
        self.errors.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct BrokenCallback;

impl ProgressCallback for BrokenCallback {
    fn on_task_start(&self, _task: &Task, _context: &ExecutionContext) -> CallbackResult {
        panic!("progress bar crashed");
    }

    fn on_task_complete(&self, _result: &TaskResult) -> CallbackResult {
        Err("progress sink closed".into())
    }
}

fn selector_for(backend: &Arc<ScriptedBackend>) -> Arc<dyn BackendSelector> {
    Arc::new(SingleBackend::new(Arc::clone(backend) as Arc<dyn Backend>))
}

fn parallel(backend: &Arc<ScriptedBackend>, max_workers: usize) -> ParallelExecutor {
    ParallelExecutor::new(selector_for(backend), max_workers, Duration::from_secs(30))
        .expect("valid executor")
        .with_isolation(IsolationLevel::None)
}

/// Selector reporting a configuration problem for tasks described as `misconfigured`.
struct MisconfiguredSelector {
    inner: Arc<dyn BackendSelector>,
}

impl BackendSelector for MisconfiguredSelector {
    fn select_backend(&self, task: &Task, context: &ExecutionContext) -> Result<Arc<dyn Backend>> {
        if task.description.starts_with("misconfigured") {
            return Err(ConductorError::Config(
                "no backend configured for this task".to_owned(),
            ));
        }
        self.inner.select_backend(task, context)
    }
}

fn base() -> ExecutionContext {
    ExecutionContext::new("demo", ".", "main", ".conductor")
}

fn ids(results: &[TaskResult]) -> Vec<&str> {
    results.iter().map(|result| result.task.id.as_str()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_results_keep_input_order() {
    let backend = Arc::new(ScriptedBackend::default());
    let executor = parallel(&backend, 4);
    let delays = [90, 10, 60, 0, 40, 20, 70, 5];
    let tasks: Vec<Task> = delays
        .iter()
        .enumerate()
        .map(|(index, delay)| Task::new(format!("task-{index}"), format!("sleep {delay}")))
        .collect();

    let results = executor
        .execute_tasks(&tasks, &base(), None)
        .await
        .expect("batch succeeds");

    assert_eq!(results.len(), tasks.len());
    let expected: Vec<&str> = tasks.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids(&results), expected);
    assert!(results.iter().all(TaskResult::is_success));
}

#[tokio::test]
async fn test_parallel_partial_failure_returns_every_result() {
    let backend = Arc::new(ScriptedBackend::default());
    let executor = parallel(&backend, 2);
    let tasks = vec![
        Task::new("ok", "build it"),
        Task::new("broken", "fail please"),
        Task::new("nonzero", "exit quietly"),
    ];

    let results = executor
        .execute_tasks(&tasks, &base(), None)
        .await
        .expect("partial failure is not an error");

    assert_eq!(ids(&results), vec!["ok", "broken", "nonzero"]);
    assert!(results[0].is_success());
    assert_eq!(
        results[1].error_message.as_deref(),
        Some("Backend failed: broken broke")
    );
    assert_eq!(results[2].exit_code, 3);
    assert_eq!(
        results[2].error_message.as_deref(),
        Some("backend exited with code 3")
    );
}

#[tokio::test]
async fn test_parallel_total_failure_is_aggregate() {
    let backend = Arc::new(ScriptedBackend::default());
    let executor = parallel(&backend, 3);
    let tasks = vec![
        Task::new("a", "fail"),
        Task::new("b", "fail"),
        Task::new("c", "panic"),
    ];

    let error = executor
        .execute_tasks(&tasks, &base(), None)
        .await
        .err()
        .expect("every task failed");

    assert!(error.to_string().contains("All 3 tasks"));
    let results = error.into_results().expect("aggregate carries results");
    assert_eq!(ids(&results), vec!["a", "b", "c"]);
    assert!(results.iter().all(|result| result.error_message.is_some()));
}

#[tokio::test]
async fn test_backend_panic_is_captured() {
    let backend = Arc::new(ScriptedBackend::default());
    let executor = parallel(&backend, 2);
    let tasks = vec![Task::new("boom", "panic now"), Task::new("fine", "work")];

    let results = executor
        .execute_tasks(&tasks, &base(), None)
        .await
        .expect("one task succeeded");

    assert!(!results[0].is_success());
    assert!(
        results[0]
            .error_message
            .as_deref()
            .is_some_and(|message| message.contains("panicked"))
    );
    assert!(results[1].is_success());
}

#[tokio::test]
async fn test_empty_batch_returns_empty_results() {
    let backend = Arc::new(ScriptedBackend::default());
    let results = parallel(&backend, 2)
        .execute_tasks(&[], &base(), None)
        .await
        .expect("empty batch");
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_timeout_fails_only_the_slow_task() {
    let backend = Arc::new(ScriptedBackend::default());
    let executor = ParallelExecutor::new(selector_for(&backend), 2, Duration::from_millis(200))
        .expect("valid executor")
        .with_isolation(IsolationLevel::None);
    let tasks = vec![
        Task::new("slow", "sleep 10000"),
        Task::new("fast", "sleep 10"),
    ];

    let results = executor
        .execute_tasks(&tasks, &base(), None)
        .await
        .expect("fast task succeeded");

    assert!(!results[0].is_success());
    assert_eq!(results[0].exit_code, TIMEOUT_EXIT_CODE);
    assert!(
        results[0]
            .error_message
            .as_deref()
            .is_some_and(|message| message.contains("timed out"))
    );
    assert!(results[1].is_success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_bound_is_respected() {
    let backend = Arc::new(ScriptedBackend::default());
    let executor = parallel(&backend, 2);
    let tasks: Vec<Task> = (0..8)
        .map(|index| Task::new(format!("t{index}"), "sleep 30"))
        .collect();

    executor
        .execute_tasks(&tasks, &base(), None)
        .await
        .expect("batch succeeds");

    assert!(backend.peak() >= 1);
    assert!(backend.peak() <= 2, "peak concurrency was {}", backend.peak());
}

#[test]
fn test_invalid_pool_settings_are_configuration_errors() {
    let backend = Arc::new(ScriptedBackend::default());
    for workers in [0, 33] {
        let error = ParallelExecutor::new(selector_for(&backend), workers, Duration::from_secs(1))
            .err()
            .expect("rejected");
        assert!(error.is_configuration());
    }

    let config = ExecutionConfig {
        timeout_seconds: -1,
        ..ExecutionConfig::default()
    };
    let error = build_executor(&config, selector_for(&backend))
        .err()
        .expect("negative timeout rejected");
    assert!(error.is_configuration());
}

#[tokio::test]
async fn test_callbacks_fire_once_per_task() {
    let workspace = TempDir::new().expect("tempdir");
    let backend = Arc::new(ScriptedBackend::default());
    let executor = ParallelExecutor::new(selector_for(&backend), 3, Duration::from_secs(30))
        .expect("valid executor")
        .with_isolation(IsolationLevel::Directory);
    let base = ExecutionContext::new("demo", workspace.path(), "main", workspace.path());
    let callback = CountingCallback::default();
    let tasks = vec![
        Task::new("a", "work"),
        Task::new("b", "fail"),
        Task::new("c", "work"),
        Task::new("../escape", "work"),
    ];

    let results = executor
        .execute_tasks(&tasks, &base, Some(&callback))
        .await
        .expect("some tasks succeeded");

    assert_eq!(results.len(), 4);
    assert!(!results[3].is_success());
    assert_eq!(callback.counts(), (3, 3, 1));
}

#[tokio::test]
async fn test_broken_callback_does_not_abort_batch() {
    let backend = Arc::new(ScriptedBackend::default());
    let tasks = vec![Task::new("a", "work"), Task::new("b", "work")];

    let results = parallel(&backend, 2)
        .execute_tasks(&tasks, &base(), Some(&BrokenCallback))
        .await
        .expect("callbacks cannot fail the batch");
    assert!(results.iter().all(TaskResult::is_success));

    let results = SequentialExecutor::new(Arc::clone(&backend) as Arc<dyn Backend>)
        .execute_tasks(&tasks, &base(), Some(&BrokenCallback))
        .await
        .expect("callbacks cannot fail the batch");
    assert!(results.iter().all(TaskResult::is_success));
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_refuses_new_work() {
    let backend = Arc::new(ScriptedBackend::default());
    let executor = parallel(&backend, 2);
    let tasks = vec![Task::new("before", "work")];
    executor
        .execute_tasks(&tasks, &base(), None)
        .await
        .expect("runs before shutdown");

    executor.shutdown(Duration::from_secs(1)).await;
    executor.shutdown(Duration::from_secs(1)).await;
    assert!(executor.is_shut_down());

    let error = executor
        .execute_tasks(&[Task::new("after", "work")], &base(), None)
        .await
        .err()
        .expect("no work accepted after shutdown");
    let results = error.into_results().expect("aggregate");
    assert_eq!(
        results[0].error_message.as_deref(),
        Some("Executor has been shut down")
    );
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_work() {
    let backend = Arc::new(ScriptedBackend::default());
    let executor = Arc::new(parallel(&backend, 1));
    let running = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move {
            executor
                .execute_tasks(&[Task::new("long", "sleep 100")], &base(), None)
                .await
        })
    };

    sleep(Duration::from_millis(20)).await;
    executor.shutdown(Duration::from_secs(5)).await;

    let results = running
        .await
        .expect("join")
        .expect("in-flight task finished");
    assert!(results[0].is_success());
}

fn routed_registry(backend: &Arc<ScriptedBackend>) -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    for backend_type in ["standard", "rapid", "quality"] {
        let shared = Arc::clone(backend);
        registry.register(
            backend_type,
            Arc::new(move |_settings: &Value| -> Result<Arc<dyn Backend>> {
                Ok(Arc::clone(&shared) as Arc<dyn Backend>)
            }),
        );
    }
    registry
}

#[tokio::test]
async fn test_full_isolation_with_router_creates_task_dirs() {
    let workspace = TempDir::new().expect("tempdir");
    let backend = Arc::new(ScriptedBackend::default());
    let router = BackendRouter::new(&RoutingConfig::default(), routed_registry(&backend))
        .expect("router");
    let executor = ParallelExecutor::new(Arc::new(router), 4, Duration::from_secs(30))
        .expect("valid executor");
    let base = ExecutionContext::new(
        "demo",
        workspace.path(),
        "main",
        workspace.path().join(".conductor"),
    );
    let tasks = vec![
        Task::new("proto_1", "Scaffold the new API"),
        Task::new("docs 2", "Update the README"),
    ];

    executor
        .execute_tasks(&tasks, &base, None)
        .await
        .expect("batch succeeds");

    assert!(workspace.path().join("tasks/proto_1").is_dir());
    assert!(workspace.path().join("tasks/docs 2").is_dir());
    assert!(workspace.path().join(".conductor/tasks/proto_1").is_dir());

    let mut branches: Vec<String> = backend
        .contexts
        .lock()
        .expect("lock")
        .iter()
        .map(|context| context.branch.clone())
        .collect();
    branches.sort();
    assert_eq!(branches, vec!["main-task-docs-2", "main-task-proto-1"]);
}

#[tokio::test]
async fn test_sequential_with_router_isolates_when_asked() {
    let workspace = TempDir::new().expect("tempdir");
    let backend = Arc::new(ScriptedBackend::default());
    let router = BackendRouter::new(&RoutingConfig::default(), routed_registry(&backend))
        .expect("router");
    let executor =
        SequentialExecutor::with_router(Arc::new(router)).with_isolation(IsolationLevel::Directory);
    let base = ExecutionContext::new("demo", workspace.path(), "main", workspace.path());

    let results = executor
        .execute_tasks(&[Task::new("t1", "Write tests for parser")], &base, None)
        .await
        .expect("batch succeeds");

    assert_eq!(results.len(), 1);
    let contexts = backend.contexts.lock().expect("lock");
    assert_eq!(contexts[0].working_dir, workspace.path().join("tasks/t1"));
    assert_eq!(contexts[0].branch, "main");
}

#[tokio::test]
async fn test_timed_out_work_keeps_its_worker_slot() {
    let backend = Arc::new(ScriptedBackend::default());
    let executor = ParallelExecutor::new(selector_for(&backend), 1, Duration::from_millis(50))
        .expect("valid executor")
        .with_isolation(IsolationLevel::None);
    let tasks: Vec<Task> = (0..3)
        .map(|index| Task::new(format!("t{index}"), "sleep 200"))
        .collect();

    let error = executor
        .execute_tasks(&tasks, &base(), None)
        .await
        .err()
        .expect("every task timed out");

    let results = error.into_results().expect("aggregate");
    assert!(results.iter().all(|result| result.exit_code == TIMEOUT_EXIT_CODE));
    assert_eq!(backend.peak(), 1, "timed-out calls overlapped");
}

#[tokio::test]
async fn test_parallel_configuration_error_aborts_batch() {
    let backend = Arc::new(ScriptedBackend::default());
    let selector = Arc::new(MisconfiguredSelector {
        inner: selector_for(&backend),
    });
    let executor = ParallelExecutor::new(selector, 2, Duration::from_secs(30))
        .expect("valid executor")
        .with_isolation(IsolationLevel::None);
    let tasks = vec![
        Task::new("fine", "work"),
        Task::new("broken", "misconfigured backend"),
    ];

    let error = executor
        .execute_tasks(&tasks, &base(), None)
        .await
        .err()
        .expect("configuration error crosses the executor");

    assert!(error.is_configuration());
    assert!(error.results().is_none());
}

#[tokio::test]
async fn test_sequential_configuration_error_aborts_batch() {
    let backend = Arc::new(ScriptedBackend::default());
    let selector = Arc::new(MisconfiguredSelector {
        inner: selector_for(&backend),
    });
    let callback = CountingCallback::default();
    let tasks = vec![
        Task::new("first", "work"),
        Task::new("broken", "misconfigured backend"),
        Task::new("never", "work"),
    ];

    let error = SequentialExecutor::with_router(selector)
        .execute_tasks(&tasks, &base(), Some(&callback))
        .await
        .err()
        .expect("configuration error crosses the executor");

    assert!(error.is_configuration());
    assert_eq!(callback.counts(), (1, 1, 0));
}

#[tokio::test]
async fn test_unbuildable_default_backend_fails_before_any_task() {
    let mut registry = BackendRegistry::new();
    registry.register(
        "standard",
        Arc::new(|_settings: &Value| -> Result<Arc<dyn Backend>> {
            Err(ConductorError::BackendConstruction {
                backend_type: "standard".to_owned(),
                reason: "missing credentials".to_owned(),
            })
        }),
    );

    let error = BackendRouter::new(&RoutingConfig::default(), registry)
        .err()
        .expect("default backend must be buildable");
    assert!(error.is_configuration());
}
