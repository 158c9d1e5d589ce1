//! Task executors: run a batch of tasks one after another or on a bounded worker
//! pool, with per-task isolation, backend selection and progress callbacks.
//!
//! Both executors implement [`TaskExecutor`] and give the same guarantees, so the
//! mode is a configuration choice:
//!
//! ```no_run
//! use conductor_core::{BackendSelector, ExecutionConfig, ExecutionContext, Task};
//! use conductor_executor::build_executor;
//! use std::sync::Arc;
//!
//! # async fn example(selector: Arc<dyn BackendSelector>) -> conductor_core::Result<()> {
//! let executor = build_executor(&ExecutionConfig::default(), selector)?;
//! let base = ExecutionContext::new("demo", "/srv/demo", "main", "/srv/demo/.conductor");
//! let tasks = vec![Task::new("t1", "Write tests for the parser")];
//!
//! let results = executor.execute_tasks(&tasks, &base, None).await?;
//! executor.shutdown(std::time::Duration::from_secs(30)).await;
//! # drop(results);
//! # Ok(())
//! # }
//! ```

/// The executor contract
pub mod contract;
mod dispatch;
/// Config-driven executor construction
pub mod factory;
/// Worker-pool executor
pub mod parallel;
/// One-at-a-time executor
pub mod sequential;

pub use contract::TaskExecutor;
pub use factory::build_executor;
pub use parallel::{DEFAULT_TASK_TIMEOUT, ParallelExecutor};
pub use sequential::SequentialExecutor;
