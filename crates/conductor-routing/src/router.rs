//! Rule-based backend router with a lazily populated, shared backend cache.

use crate::classify::classify_task;
use crate::registry::BackendRegistry;
use crate::rules::RoutingRules;
use conductor_core::{
    Backend, BackendSelector, ConductorError, ExecutionContext, Result, RoutingConfig, Task,
};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

type BackendCell = Arc<OnceCell<Arc<dyn Backend>>>;

/// Classifies tasks, applies routing rules and hands out cached backend instances.
///
/// The cache lives as long as the router and is shared by every task routed through
/// it. Each backend type is constructed at most once, even when many tasks ask for
/// it concurrently.
pub struct BackendRouter {
    rules: RoutingRules,
    registry: BackendRegistry,
    cache: Mutex<HashMap<String, BackendCell>>,
}

impl BackendRouter {
    /// Creates a router from routing configuration and a backend registry.
    ///
    /// The default backend is constructed here, so every later selection has a
    /// working fallback.
    ///
    /// # Errors
    /// Returns a configuration error if the default backend type is empty, has no
    /// registered factory, or cannot be constructed.
    pub fn new(config: &RoutingConfig, registry: BackendRegistry) -> Result<Self> {
        config.validate()?;
        if !registry.contains(&config.default_backend) {
            return Err(ConductorError::Config(format!(
                "unknown default backend type '{}' (registered: {})",
                config.default_backend,
                registry.backend_types().join(", ")
            )));
        }

        let rules = RoutingRules::merged(&config.default_backend, &config.rules);
        let backends = registry.backend_types().len();
        let router = Self {
            rules,
            registry,
            cache: Mutex::new(HashMap::new()),
        };
        router.initialize_backend(&config.default_backend)?;

        tracing::info!(
            default_backend = %config.default_backend,
            custom_rules = config.rules.len(),
            backends,
            "Backend router initialized"
        );

        Ok(router)
    }

    /// Classifies `task` into a task type; see [`classify_task`].
    pub fn classify_task(&self, task: &Task) -> String {
        classify_task(task)
    }

    /// Backend type for `task_type` according to the merged rule table.
    pub fn apply_routing_rules(&self, task_type: &str) -> &str {
        self.rules.apply(task_type)
    }

    /// The merged rule table.
    pub fn rules(&self) -> &RoutingRules {
        &self.rules
    }

    /// Returns the cached backend for `backend_type`, constructing it on first use.
    ///
    /// If construction fails the default backend is used instead and cached under
    /// `backend_type` as well, so the failing construction is not retried.
    ///
    /// # Errors
    /// Returns a configuration error if the default backend cannot be constructed.
    pub fn initialize_backend(&self, backend_type: &str) -> Result<Arc<dyn Backend>> {
        let cell = self.cell_for(backend_type);
        let backend = cell.get_or_try_init(|| self.construct_or_fallback(backend_type))?;
        Ok(Arc::clone(backend))
    }

    /// Number of backend types with a constructed, cached instance.
    pub fn cached_backends(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    fn cell_for(&self, backend_type: &str) -> BackendCell {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(backend_type.to_owned()).or_default())
    }

    fn construct_or_fallback(&self, backend_type: &str) -> Result<Arc<dyn Backend>> {
        match self.registry.build(backend_type) {
            Ok(backend) => {
                tracing::info!(backend = backend_type, "Constructed backend");
                Ok(backend)
            }
            Err(error) if backend_type == self.rules.default_backend() => {
                Err(ConductorError::Config(format!(
                    "default backend '{backend_type}' could not be constructed: {error}"
                )))
            }
            Err(error) => {
                let fallback = self.rules.default_backend();
                tracing::warn!(
                    backend = backend_type,
                    fallback,
                    error = %error,
                    "Backend construction failed, falling back to default"
                );
                self.initialize_backend(fallback)
            }
        }
    }
}

impl BackendSelector for BackendRouter {
    fn select_backend(&self, task: &Task, context: &ExecutionContext) -> Result<Arc<dyn Backend>> {
        let task_type = self.classify_task(task);
        let backend_type = self.apply_routing_rules(&task_type);
        let backend = self.initialize_backend(backend_type)?;

        tracing::info!(
            task_id = %task.id,
            task_type = %task_type,
            backend_type,
            backend = backend.name(),
            branch = %context.branch,
            "Selected backend"
        );

        Ok(backend)
    }
}
