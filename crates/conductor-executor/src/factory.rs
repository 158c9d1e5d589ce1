//! Builds an executor from execution settings.

use crate::contract::TaskExecutor;
use crate::parallel::ParallelExecutor;
use crate::sequential::SequentialExecutor;
use conductor_core::{BackendSelector, ExecutionConfig, ExecutionMode, Result};
use std::sync::Arc;

/// Builds the executor named by `config.mode`.
///
/// Both modes take their isolation level from the configuration.
///
/// # Errors
/// Returns a configuration error if the settings fail validation, whichever mode is chosen.
pub fn build_executor(
    config: &ExecutionConfig,
    selector: Arc<dyn BackendSelector>,
) -> Result<Box<dyn TaskExecutor>> {
    config.validate()?;
    tracing::debug!(mode = %config.mode, isolation = %config.isolation, "Building executor");

    Ok(match config.mode {
        ExecutionMode::Sequential => {
            Box::new(SequentialExecutor::with_router(selector).with_isolation(config.isolation))
        }
        ExecutionMode::Parallel => Box::new(ParallelExecutor::from_config(config, selector)?),
    })
}
