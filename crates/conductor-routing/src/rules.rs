//! Task type to backend type routing rules.

use crate::classify::{GENERAL, TaskCategory};
use std::collections::HashMap;

/// Backend type for quick, generative work.
pub const RAPID_BACKEND: &str = "rapid";
/// Backend type for careful, quality-focused work.
pub const QUALITY_BACKEND: &str = "quality";

/// Merged routing table: built-in defaults overlaid with caller overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRules {
    rules: HashMap<String, String>,
    default_backend: String,
}

impl RoutingRules {
    /// Built-in rules with `general` routed to `default_backend`.
    pub fn defaults(default_backend: &str) -> Self {
        let mut rules = HashMap::new();
        rules.insert(
            TaskCategory::Prototyping.as_str().to_owned(),
            RAPID_BACKEND.to_owned(),
        );
        for category in [
            TaskCategory::Refactoring,
            TaskCategory::Testing,
            TaskCategory::Documentation,
        ] {
            rules.insert(category.as_str().to_owned(), QUALITY_BACKEND.to_owned());
        }
        rules.insert(GENERAL.to_owned(), default_backend.to_owned());

        Self {
            rules,
            default_backend: default_backend.to_owned(),
        }
    }

    /// Built-in rules overlaid with `overrides`; an override wins per key.
    pub fn merged(default_backend: &str, overrides: &HashMap<String, String>) -> Self {
        let mut merged = Self::defaults(default_backend);
        merged.rules.extend(
            overrides
                .iter()
                .map(|(task_type, backend_type)| (task_type.clone(), backend_type.clone())),
        );
        merged
    }

    /// Backend type for `task_type`, or the default backend when no rule exists.
    pub fn apply(&self, task_type: &str) -> &str {
        self.rules
            .get(task_type)
            .map_or(self.default_backend.as_str(), String::as_str)
    }

    /// Backend type used when nothing else applies.
    pub fn default_backend(&self) -> &str {
        &self.default_backend
    }

    /// Iterates over all rules.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules
            .iter()
            .map(|(task_type, backend_type)| (task_type.as_str(), backend_type.as_str()))
    }
}
