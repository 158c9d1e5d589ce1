//! Execution contexts and per-task isolation.
//!
//! A batch runs under one *base* context. Before dispatch every task gets its own
//! *task context* derived from the base according to an [`IsolationLevel`]:
//! disjoint working/state directories and branch names let tasks run side by side
//! without locking. Only directories are created here; branches are merely named.

use crate::error::{ConductorError, Result};
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Subdirectory holding per-task directories.
const TASKS_DIR: &str = "tasks";

/// How much of the execution context is made exclusive to one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    /// Task shares the base context
    #[default]
    None,
    /// Working directory only
    Directory,
    /// Branch name only
    Branch,
    /// Working directory, branch and state directory
    Full,
}

impl IsolationLevel {
    /// Name used in configuration files and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Directory => "directory",
            Self::Branch => "branch",
            Self::Full => "full",
        }
    }

    fn isolates_directory(self) -> bool {
        matches!(self, Self::Directory | Self::Full)
    }

    fn isolates_branch(self) -> bool {
        matches!(self, Self::Branch | Self::Full)
    }
}

impl Display for IsolationLevel {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for IsolationLevel {
    type Err = ConductorError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "directory" => Ok(Self::Directory),
            "branch" => Ok(Self::Branch),
            "full" => Ok(Self::Full),
            other => Err(ConductorError::Config(format!(
                "unknown isolation level '{other}' (expected none, directory, branch or full)"
            ))),
        }
    }
}

/// Where a task runs: project, working tree, branch and state directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Project identifier
    pub project_id: String,
    /// Working directory the backend operates in
    pub working_dir: PathBuf,
    /// Version-control branch name
    pub branch: String,
    /// Directory for task state and artifacts
    pub state_dir: PathBuf,
    /// Isolation applied to this context
    pub isolation: IsolationLevel,
}

impl ExecutionContext {
    /// Creates a base context with no isolation applied.
    pub fn new(
        project_id: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        branch: impl Into<String>,
        state_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            working_dir: working_dir.into(),
            branch: branch.into(),
            state_dir: state_dir.into(),
            isolation: IsolationLevel::None,
        }
    }

    /// Derives the context for `task_id`; see [`derive_isolated_context`].
    ///
    /// # Errors
    /// Returns an error if the task id is not a valid path component or an
    /// isolated directory cannot be created.
    pub fn isolate_for(&self, task_id: &TaskId, level: IsolationLevel) -> Result<Self> {
        derive_isolated_context(self, task_id, level)
    }
}

/// Derives the execution context of one task from the batch's base context.
///
/// The result depends only on the inputs, so deriving twice yields the same paths
/// and names. Directories are created with "create if absent" semantics.
///
/// - `None`: the base context, untouched.
/// - `Directory`: working directory becomes `{working_dir}/tasks/{task_id}`.
/// - `Branch`: branch becomes `{branch}-task-{sanitized task_id}`.
/// - `Full`: both, plus state directory `{state_dir}/tasks/{task_id}`.
///
/// # Errors
/// Returns [`ConductorError::InvalidTaskId`] if the id cannot be used as a path
/// component, or [`ConductorError::Isolation`] if a directory cannot be created.
pub fn derive_isolated_context(
    base: &ExecutionContext,
    task_id: &TaskId,
    level: IsolationLevel,
) -> Result<ExecutionContext> {
    if level == IsolationLevel::None {
        return Ok(base.clone());
    }

    let mut context = base.clone();
    context.isolation = level;

    if level.isolates_directory() {
        validate_path_component(task_id)?;
        context.working_dir = ensure_task_dir(&base.working_dir, task_id)?;
    }

    if level.isolates_branch() {
        context.branch = format!(
            "{}-task-{}",
            base.branch,
            sanitize_branch_component(task_id.as_str())
        );
    }

    if level == IsolationLevel::Full {
        context.state_dir = ensure_task_dir(&base.state_dir, task_id)?;
    }

    Ok(context)
}

/// Replaces underscores and spaces with hyphens so the value is a valid branch name segment.
pub fn sanitize_branch_component(value: &str) -> String {
    value
        .chars()
        .map(|character| match character {
            '_' | ' ' => '-',
            other => other,
        })
        .collect()
}

fn validate_path_component(task_id: &TaskId) -> Result<()> {
    let id = task_id.as_str();
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(ConductorError::InvalidTaskId(id.to_owned()));
    }
    Ok(())
}

fn ensure_task_dir(root: &Path, task_id: &TaskId) -> Result<PathBuf> {
    let path = root.join(TASKS_DIR).join(task_id.as_str());
    create_dir_all(&path).map_err(|source| ConductorError::Isolation {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
