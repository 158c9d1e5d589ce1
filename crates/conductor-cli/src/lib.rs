//! Library side of the `conductor` binary: batch loading, the shell command backend,
//! progress logging and router wiring.
//!
//! Exposed for integration testing.

/// Task batch files
pub mod batch;
/// Shell command backend
pub mod command_backend;
/// Progress logging
pub mod progress;

pub use batch::{load_batch, parse_batch};
pub use command_backend::{CommandBackend, command_factory};
pub use progress::LoggingProgress;

use conductor_core::{ConductorConfig, Result};
use conductor_routing::{BackendRegistry, BackendRouter, RoutingRules};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Backend types the configuration can route to: the default, every built-in or
/// configured rule target and every `[backends.*]` section.
pub fn referenced_backend_types(config: &ConductorConfig) -> BTreeSet<String> {
    let mut types: BTreeSet<String> = config.backends.keys().cloned().collect();
    let rules = RoutingRules::merged(&config.routing.default_backend, &config.routing.rules);
    types.insert(rules.default_backend().to_owned());
    types.extend(rules.iter().map(|(_, backend_type)| backend_type.to_owned()));
    types
}

/// Registry with a command backend factory for every referenced backend type.
pub fn build_registry(config: &ConductorConfig) -> BackendRegistry {
    let mut registry = BackendRegistry::new().with_all_settings(&config.backends);
    for backend_type in referenced_backend_types(config) {
        registry.register(backend_type.clone(), Arc::new(command_factory(backend_type)));
    }
    registry
}

/// Router over command backends built from `config`.
///
/// # Errors
/// Returns a configuration error if the routing section is invalid.
pub fn build_router(config: &ConductorConfig) -> Result<BackendRouter> {
    BackendRouter::new(&config.routing, build_registry(config))
}

/// Configuration written by `conductor config init`: the defaults plus command
/// backends that echo the task they receive.
pub fn starter_config() -> ConductorConfig {
    let mut config = ConductorConfig::default();
    for backend_type in referenced_backend_types(&config) {
        config.backends.insert(
            backend_type.clone(),
            json!({ "command": format!("echo \"[{backend_type}] $CONDUCTOR_TASK_ID: $CONDUCTOR_TASK_DESCRIPTION\"") }),
        );
    }
    config
}
