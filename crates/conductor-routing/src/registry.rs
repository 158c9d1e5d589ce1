//! Registry of backend constructors, keyed by backend type.
//!
//! The registry only knows *how* to build backends. Instances are created lazily and
//! cached by the [`BackendRouter`](crate::BackendRouter).

use conductor_core::{Backend, ConductorError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds backend instances from backend-specific settings.
pub trait BackendFactory: Send + Sync {
    /// Constructs a backend from `settings` (`Value::Null` when none are configured).
    ///
    /// # Errors
    /// Returns an error if the settings are unusable or construction fails.
    fn create(&self, settings: &Value) -> Result<Arc<dyn Backend>>;
}

impl<F> BackendFactory for F
where
    F: Fn(&Value) -> Result<Arc<dyn Backend>> + Send + Sync,
{
    fn create(&self, settings: &Value) -> Result<Arc<dyn Backend>> {
        self(settings)
    }
}

/// Maps backend types to their factories and settings.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: HashMap<String, Arc<dyn BackendFactory>>,
    settings: HashMap<String, Value>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for `backend_type`, replacing any previous one.
    #[must_use]
    pub fn with_factory(
        mut self,
        backend_type: impl Into<String>,
        factory: impl BackendFactory + 'static,
    ) -> Self {
        self.register(backend_type, Arc::new(factory));
        self
    }

    /// Registers `factory` for `backend_type`, replacing any previous one.
    pub fn register(&mut self, backend_type: impl Into<String>, factory: Arc<dyn BackendFactory>) {
        self.factories.insert(backend_type.into(), factory);
    }

    /// Sets construction settings for `backend_type`.
    #[must_use]
    pub fn with_settings(mut self, backend_type: impl Into<String>, settings: Value) -> Self {
        self.settings.insert(backend_type.into(), settings);
        self
    }

    /// Sets construction settings for every backend type in `settings`.
    #[must_use]
    pub fn with_all_settings(mut self, settings: &HashMap<String, Value>) -> Self {
        self.settings.extend(
            settings
                .iter()
                .map(|(backend_type, value)| (backend_type.clone(), value.clone())),
        );
        self
    }

    /// Whether a factory is registered for `backend_type`.
    pub fn contains(&self, backend_type: &str) -> bool {
        self.factories.contains_key(backend_type)
    }

    /// Registered backend types, sorted.
    pub fn backend_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Constructs a new backend of `backend_type` with its configured settings.
    ///
    /// # Errors
    /// Returns [`ConductorError::BackendConstruction`] if the type is unknown or the
    /// factory fails.
    pub fn build(&self, backend_type: &str) -> Result<Arc<dyn Backend>> {
        let factory =
            self.factories
                .get(backend_type)
                .ok_or_else(|| ConductorError::BackendConstruction {
                    backend_type: backend_type.to_owned(),
                    reason: "no factory registered for this backend type".to_owned(),
                })?;
        let settings = self.settings.get(backend_type).unwrap_or(&Value::Null);

        factory
            .create(settings)
            .map_err(|error| match error {
                construction @ ConductorError::BackendConstruction { .. } => construction,
                other => ConductorError::BackendConstruction {
                    backend_type: backend_type.to_owned(),
                    reason: other.to_string(),
                },
            })
    }
}
