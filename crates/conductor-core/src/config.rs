//! Configuration for executors, routing rules and backend settings.
//!
//! The configuration lives in a TOML file (by default `~/.conductor/config.toml`):
//!
//! ```toml
//! [execution]
//! mode = "parallel"
//! max_workers = 4
//! timeout_seconds = 3600
//! isolation = "full"
//!
//! [routing]
//! default_backend = "standard"
//!
//! [routing.rules]
//! prototyping = "rapid"
//!
//! [backends.rapid]
//! command = "./scripts/generate.sh"
//! ```
//!
//! Every loader validates before returning, so invalid values never reach an executor.

use crate::context::IsolationLevel;
use crate::error::{ConductorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Smallest accepted worker pool size.
pub const MIN_WORKERS: usize = 1;
/// Largest accepted worker pool size.
pub const MAX_WORKERS: usize = 32;
/// Default per-task timeout (one hour).
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 3600;
/// Default backend type used when nothing else matches.
pub const DEFAULT_BACKEND: &str = "standard";

/// How an executor distributes the tasks of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One task after another on the caller's task
    Sequential,
    /// Bounded worker pool
    #[default]
    Parallel,
}

impl ExecutionMode {
    /// Name used in configuration files and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

impl Display for ExecutionMode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = ConductorError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            other => Err(ConductorError::Config(format!(
                "unknown execution mode '{other}' (expected sequential or parallel)"
            ))),
        }
    }
}

/// Complete configuration.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorConfig {
    /// Executor configuration
    pub execution: ExecutionConfig,
    /// Routing configuration
    pub routing: RoutingConfig,
    /// Backend-specific settings, keyed by backend type
    pub backends: HashMap<String, Value>,
}

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Sequential or parallel execution
    pub mode: ExecutionMode,
    /// Worker pool size for parallel execution
    pub max_workers: usize,
    /// Per-task timeout in seconds
    pub timeout_seconds: i64,
    /// Isolation applied to each task's context
    pub isolation: IsolationLevel,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Parallel,
            max_workers: 4,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            isolation: IsolationLevel::Full,
        }
    }
}

impl ExecutionConfig {
    /// Checks pool size and timeout.
    ///
    /// # Errors
    /// Returns a configuration error if either value is out of range.
    pub fn validate(&self) -> Result<()> {
        validate_max_workers(self.max_workers)?;
        self.timeout().map(|_| ())
    }

    /// Per-task timeout as a `Duration`.
    ///
    /// # Errors
    /// Returns a configuration error if the timeout is not positive.
    pub fn timeout(&self) -> Result<Duration> {
        u64::try_from(self.timeout_seconds)
            .ok()
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                ConductorError::Config(format!(
                    "timeout must be a positive number of seconds, got {}",
                    self.timeout_seconds
                ))
            })
    }
}

/// Routing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Backend type used for unmatched task types and as construction fallback
    pub default_backend: String,
    /// Task type to backend type overrides, applied over the built-in rules
    pub rules: HashMap<String, String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_backend: DEFAULT_BACKEND.to_owned(),
            rules: HashMap::default(),
        }
    }
}

impl RoutingConfig {
    /// Checks that a default backend is named.
    ///
    /// # Errors
    /// Returns a configuration error if the default backend type is empty.
    pub fn validate(&self) -> Result<()> {
        if self.default_backend.trim().is_empty() {
            return Err(ConductorError::Config(
                "default backend type must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Checks that `max_workers` lies within `MIN_WORKERS..=MAX_WORKERS`.
///
/// # Errors
/// Returns a configuration error otherwise.
pub fn validate_max_workers(max_workers: usize) -> Result<()> {
    if (MIN_WORKERS..=MAX_WORKERS).contains(&max_workers) {
        Ok(())
    } else {
        Err(ConductorError::Config(format!(
            "max_workers must be between {MIN_WORKERS} and {MAX_WORKERS}, got {max_workers}"
        )))
    }
}

impl ConductorConfig {
    /// Get the default config directory path (`~/.conductor`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            ConductorError::Config("Could not determine home directory".to_owned())
        })?;
        Ok(home.join(".conductor"))
    }

    /// Get the default config file path (`~/.conductor/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location, creating it with defaults if missing.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read, parsed, validated or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|error| {
            ConductorError::Config(format!("Failed to read config {}: {error}", path.display()))
        })?;
        let config = Self::from_toml_str(&contents)?;

        tracing::debug!(
            path = %path.display(),
            mode = %config.execution.mode,
            max_workers = config.execution.max_workers,
            backends = config.backends.len(),
            "Loaded config"
        );

        Ok(config)
    }

    /// Parse and validate config from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text cannot be parsed or holds invalid values
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|error| ConductorError::Config(format!("Failed to parse config: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                ConductorError::Config(format!("Failed to create config directory: {error}"))
            })?;
        }

        let contents = toml::to_string_pretty(self).map_err(|error| {
            ConductorError::Config(format!("Failed to serialize config: {error}"))
        })?;

        let header = "# Conductor Configuration File\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{contents}"))
            .map_err(|error| ConductorError::Config(format!("Failed to write config: {error}")))?;

        Ok(())
    }

    /// Validate every section.
    ///
    /// # Errors
    /// Returns the first configuration error found
    pub fn validate(&self) -> Result<()> {
        self.execution.validate()?;
        self.routing.validate()
    }

    /// Settings for `backend_type`, or `Value::Null` when none are configured.
    pub fn backend_settings(&self, backend_type: &str) -> Value {
        self.backends.get(backend_type).cloned().unwrap_or(Value::Null)
    }
}
