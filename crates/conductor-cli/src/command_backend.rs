//! Backend that runs a shell command per task.

use async_trait::async_trait;
use conductor_core::{
    Backend, ConductorError, ExecutionContext, FAILURE_EXIT_CODE, Result, Task, TaskResult,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;

/// Environment variable carrying the task id
pub const ENV_TASK_ID: &str = "CONDUCTOR_TASK_ID";
/// Environment variable carrying the task description
pub const ENV_TASK_DESCRIPTION: &str = "CONDUCTOR_TASK_DESCRIPTION";
/// Environment variable carrying the task branch
pub const ENV_BRANCH: &str = "CONDUCTOR_BRANCH";
/// Environment variable carrying the task state directory
pub const ENV_STATE_DIR: &str = "CONDUCTOR_STATE_DIR";
/// Environment variable carrying the project id
pub const ENV_PROJECT: &str = "CONDUCTOR_PROJECT";

/// Runs `sh -c <command>` in the task's working directory.
///
/// The task and its context are exposed through `CONDUCTOR_*` environment variables.
/// Standard output, standard error and the exit status are captured into the result.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    name: String,
    command: String,
    env: BTreeMap<String, String>,
}

impl CommandBackend {
    /// Create a backend named `name` running `command`
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            env: BTreeMap::new(),
        }
    }

    /// Add an environment variable for every invocation
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Build from `[backends.<name>]` settings: a required `command` string and an
    /// optional `env` table of strings.
    ///
    /// # Errors
    /// Returns a construction error if `command` is missing or a setting has the wrong type.
    pub fn from_settings(name: &str, settings: &Value) -> Result<Self> {
        let invalid = |reason: String| ConductorError::BackendConstruction {
            backend_type: name.to_owned(),
            reason,
        };

        let command = settings
            .get("command")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|command| !command.is_empty())
            .ok_or_else(|| invalid("missing `command` setting".to_owned()))?;

        let mut backend = Self::new(name, command);
        match settings.get("env") {
            None | Some(Value::Null) => {}
            Some(Value::Object(vars)) => {
                for (key, value) in vars {
                    let value = value
                        .as_str()
                        .ok_or_else(|| invalid(format!("env value for `{key}` must be a string")))?;
                    backend = backend.with_env(key.clone(), value);
                }
            }
            Some(_) => return Err(invalid("`env` must be a table".to_owned())),
        }

        Ok(backend)
    }

    /// Shell command this backend runs
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl Backend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, task: &Task, context: &ExecutionContext) -> Result<TaskResult> {
        let started = Instant::now();
        tracing::debug!(
            task_id = %task.id,
            backend = %self.name,
            working_dir = %context.working_dir.display(),
            "Running command"
        );

        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(&context.working_dir)
            .envs(&self.env)
            .env(ENV_TASK_ID, task.id.as_str())
            .env(ENV_TASK_DESCRIPTION, &task.description)
            .env(ENV_BRANCH, &context.branch)
            .env(ENV_STATE_DIR, &context.state_dir)
            .env(ENV_PROJECT, &context.project_id)
            .output()
            .await
            .map_err(|error| {
                ConductorError::Backend(format!("failed to run `{}`: {error}", self.command))
            })?;

        let exit_code = output.status.code().unwrap_or(FAILURE_EXIT_CODE);
        Ok(TaskResult::success(task.clone(), started.elapsed())
            .with_exit_code(exit_code)
            .with_output(
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            )
            .with_artifacts(context.state_dir.clone()))
    }
}

/// Factory building a [`CommandBackend`] named `backend_type` from its settings
pub fn command_factory(
    backend_type: impl Into<String>,
) -> impl Fn(&Value) -> Result<Arc<dyn Backend>> + Send + Sync + 'static {
    let backend_type = backend_type.into();
    move |settings: &Value| -> Result<Arc<dyn Backend>> {
        Ok(Arc::new(CommandBackend::from_settings(&backend_type, settings)?))
    }
}
