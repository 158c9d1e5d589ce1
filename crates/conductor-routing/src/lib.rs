//! Backend routing: classify a task, map its type to a backend type, hand out a
//! shared backend instance.
//!
//! # Example
//!
//! ```no_run
//! use conductor_core::{Backend, ExecutionContext, RoutingConfig, Task, BackendSelector};
//! use conductor_routing::{BackendRegistry, BackendRouter};
//! use serde_json::Value;
//! use std::sync::Arc;
//!
//! # fn make_backend(_settings: &Value) -> conductor_core::Result<Arc<dyn Backend>> { unimplemented!() }
//! # fn example() -> conductor_core::Result<()> {
//! let registry = BackendRegistry::new()
//!     .with_factory("standard", make_backend)
//!     .with_factory("rapid", make_backend)
//!     .with_factory("quality", make_backend);
//! let router = BackendRouter::new(&RoutingConfig::default(), registry)?;
//!
//! let task = Task::new("t1", "Scaffold a new service");
//! let context = ExecutionContext::new("demo", ".", "main", ".conductor");
//! let _backend = router.select_backend(&task, &context)?;
//! # Ok(())
//! # }
//! ```

/// Keyword-based task classification
pub mod classify;
/// Backend factories
pub mod registry;
/// The router and its backend cache
pub mod router;
/// Routing rule table
pub mod rules;

pub use classify::{GENERAL, TaskCategory, classify_task};
pub use registry::{BackendFactory, BackendRegistry};
pub use router::BackendRouter;
pub use rules::{QUALITY_BACKEND, RAPID_BACKEND, RoutingRules};
