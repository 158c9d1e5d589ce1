//! Command handlers for CLI operations

use anyhow::{Context as _, Result, bail};
use conductor_cli::{LoggingProgress, build_router, load_batch, starter_config};
use conductor_core::{ConductorConfig, ConductorError, ExecutionContext, TaskResult};
use conductor_executor::build_executor;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{RouteArgs, RunArgs};

/// How long `run` waits for stragglers once the batch returned
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Loads `path`, or the default config file (created with defaults if missing).
fn load_config(path: Option<&Path>) -> Result<ConductorConfig> {
    match path {
        Some(path) => Ok(ConductorConfig::load_from_file(path)?),
        None => Ok(ConductorConfig::load_or_create().unwrap_or_else(|error| {
            tracing::warn!("Failed to load config from ~/.conductor/config.toml: {error}");
            tracing::warn!("Using default configuration");
            ConductorConfig::default()
        })),
    }
}

fn print_results(results: &[TaskResult]) -> Result<()> {
    let rendered = serde_json::to_string_pretty(results).context("Failed to render results")?;
    #[allow(clippy::print_stdout, reason = "Results are the command's output")]
    {
        println!("{rendered}");
    }
    Ok(())
}

/// Execute a task batch
///
/// # Errors
/// Returns an error if the configuration or batch cannot be loaded, or the executor
/// cannot be built.
pub async fn handle_run(args: RunArgs) -> Result<ExitCode> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        config.execution.mode = mode;
    }
    if let Some(max_workers) = args.max_workers {
        config.execution.max_workers = max_workers;
    }
    if let Some(isolation) = args.isolation {
        config.execution.isolation = isolation;
    }
    config.validate()?;

    let tasks = load_batch(&args.tasks).await?;
    let router = Arc::new(build_router(&config)?);
    let executor = build_executor(&config.execution, router)?;

    let workdir = match args.workdir {
        Some(workdir) => workdir,
        None => env::current_dir().context("Failed to determine current directory")?,
    };
    let state_dir = args
        .state_dir
        .unwrap_or_else(|| workdir.join(".conductor"));
    let project = args.project.unwrap_or_else(|| {
        workdir
            .file_name()
            .map_or_else(|| "project".to_owned(), |name| name.to_string_lossy().into_owned())
    });
    let base = ExecutionContext::new(project, workdir, args.branch, state_dir);

    tracing::info!(
        tasks = tasks.len(),
        mode = %config.execution.mode,
        isolation = %config.execution.isolation,
        project = %base.project_id,
        "Running batch"
    );

    let progress = LoggingProgress::new(tasks.len());
    let outcome = executor
        .execute_tasks(&tasks, &base, Some(&progress))
        .await;
    executor.shutdown(SHUTDOWN_GRACE).await;

    match outcome {
        Ok(results) => {
            print_results(&results)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(ConductorError::AllTasksFailed { results }) => {
            print_results(&results)?;
            tracing::error!(tasks = results.len(), "Every task in the batch failed");
            Ok(ExitCode::FAILURE)
        }
        Err(other) => Err(other.into()),
    }
}

/// Print the routing decision for every task of a batch
///
/// # Errors
/// Returns an error if the configuration or batch cannot be loaded.
pub async fn handle_route(args: &RouteArgs) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let tasks = load_batch(&args.tasks).await?;
    let router = build_router(&config)?;

    for task in &tasks {
        let task_type = router.classify_task(task);
        let backend_type = router.apply_routing_rules(&task_type);
        #[allow(clippy::print_stdout, reason = "Routing table is the command's output")]
        {
            println!("{}\t{task_type}\t{backend_type}", task.id);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Write a starter configuration
///
/// # Errors
/// Returns an error if the file exists and `force` is not set, or it cannot be written.
pub fn handle_config_init(path: Option<PathBuf>, force: bool) -> Result<ExitCode> {
    let path = match path {
        Some(path) => path,
        None => ConductorConfig::config_path()?,
    };
    if path.exists() && !force {
        bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }

    starter_config().save_to_file(&path)?;
    tracing::info!(path = %path.display(), "Wrote starter configuration");
    Ok(ExitCode::SUCCESS)
}

/// Print the effective configuration as TOML
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or rendered.
pub fn handle_config_show(path: Option<&Path>) -> Result<ExitCode> {
    let config = load_config(path)?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    #[allow(clippy::print_stdout, reason = "Configuration is the command's output")]
    {
        print!("{rendered}");
    }
    Ok(ExitCode::SUCCESS)
}
