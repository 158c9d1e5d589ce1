//! Task representation handed over by the planning layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Metadata key carrying an explicit task-type hint.
pub const TASK_TYPE_METADATA_KEY: &str = "task_type";

/// Identifier of a task, unique within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a task id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Immutable unit of work. Executors only ever read tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task
    pub id: TaskId,
    /// Human-readable description of what this task should accomplish
    pub description: String,
    /// Conditions the outcome has to satisfy
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    /// Free-form metadata, may carry a `task_type` hint
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Task {
    /// Creates a new task with no acceptance criteria or metadata.
    pub fn new(id: impl Into<TaskId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            acceptance_criteria: Vec::default(),
            metadata: HashMap::default(),
        }
    }

    /// Sets the acceptance criteria.
    #[must_use]
    pub fn with_acceptance_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.acceptance_criteria = criteria.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets an explicit task-type hint, bypassing keyword classification.
    #[must_use]
    pub fn with_task_type(self, task_type: impl Into<String>) -> Self {
        self.with_metadata(TASK_TYPE_METADATA_KEY, task_type.into())
    }

    /// Explicit task-type hint from metadata, if present and non-empty.
    pub fn task_type_hint(&self) -> Option<&str> {
        self.metadata
            .get(TASK_TYPE_METADATA_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
    }
}
