//! Outcome of running a single task.

use crate::error::ConductorError;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Exit code used for captured, non-timeout failures.
pub const FAILURE_EXIT_CODE: i32 = 1;
/// Exit code used for tasks that exceeded their timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Result of executing one task. Exactly one is produced per submitted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task this result belongs to
    pub task: Task,
    /// Process-style exit code, zero means success
    pub exit_code: i32,
    /// Captured standard output
    #[serde(default)]
    pub stdout: String,
    /// Captured standard error
    #[serde(default)]
    pub stderr: String,
    /// Wall-clock duration in seconds
    pub duration_secs: f64,
    /// Where the backend left its artifacts, if anywhere
    #[serde(default)]
    pub artifacts_path: Option<PathBuf>,
    /// Explanation of a failure
    #[serde(default)]
    pub error_message: Option<String>,
}

impl TaskResult {
    /// Creates a successful result with empty output.
    pub fn success(task: Task, duration: Duration) -> Self {
        Self {
            task,
            exit_code: 0,
            stdout: String::default(),
            stderr: String::default(),
            duration_secs: duration.as_secs_f64(),
            artifacts_path: None,
            error_message: None,
        }
    }

    /// Creates a failed result carrying `message`.
    pub fn failed(task: Task, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            exit_code: FAILURE_EXIT_CODE,
            error_message: Some(message.into()),
            ..Self::success(task, duration)
        }
    }

    /// Creates the result of a task that did not finish within `timeout`.
    pub fn timed_out(task: Task, timeout: Duration, duration: Duration) -> Self {
        Self {
            exit_code: TIMEOUT_EXIT_CODE,
            error_message: Some(ConductorError::Timeout(timeout).to_string()),
            ..Self::success(task, duration)
        }
    }

    /// Sets the exit code.
    #[must_use]
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// Sets captured standard output and error.
    #[must_use]
    pub fn with_output(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self.stderr = stderr.into();
        self
    }

    /// Sets the artifacts path.
    #[must_use]
    pub fn with_artifacts(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifacts_path = Some(path.into());
        self
    }

    /// True iff the exit code is zero.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Fills in what a backend left out: the measured duration when none was
    /// reported, and an error message for failures that came without one.
    #[must_use]
    pub fn normalized(mut self, measured: Duration) -> Self {
        if self.duration_secs <= 0.0 {
            self.duration_secs = measured.as_secs_f64();
        }
        let missing_message = self
            .error_message
            .as_deref()
            .is_none_or(|message| message.trim().is_empty());
        if !self.is_success() && missing_message {
            self.error_message = Some(format!("backend exited with code {}", self.exit_code));
        }
        self
    }
}
