//! Core types and traits for batch task execution.
//!
//! This crate holds everything executors and routers share:
//!
//! - [`Task`] and [`TaskResult`]: what goes into a batch and what comes out
//! - [`ExecutionContext`] and [`IsolationLevel`]: where a task runs, and how its
//!   context is derived from the batch's base context
//! - [`Backend`] and [`BackendSelector`]: the seams behind which real work and
//!   backend routing live
//! - [`ProgressCallback`]: optional observer of task boundaries
//! - [`ConductorConfig`]: TOML configuration
//! - [`ConductorError`]: the error taxonomy

/// Backend and selector traits.
pub mod backend;
/// Configuration model and loading.
pub mod config;
/// Execution contexts and isolation.
pub mod context;
/// Error types and result alias.
pub mod error;
/// Progress callbacks.
pub mod progress;
/// Task results.
pub mod result;
/// Task representation.
pub mod task;

pub use backend::{Backend, BackendSelector, SingleBackend};
pub use config::{
    ConductorConfig, DEFAULT_BACKEND, ExecutionConfig, ExecutionMode, MAX_WORKERS, MIN_WORKERS,
    RoutingConfig, validate_max_workers,
};
pub use context::{
    ExecutionContext, IsolationLevel, derive_isolated_context, sanitize_branch_component,
};
pub use error::{ConductorError, Result};
pub use progress::{CallbackResult, NoopProgress, ProgressCallback};
pub use result::{FAILURE_EXIT_CODE, TIMEOUT_EXIT_CODE, TaskResult};
pub use task::{TASK_TYPE_METADATA_KEY, Task, TaskId};
