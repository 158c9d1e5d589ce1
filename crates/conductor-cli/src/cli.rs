use clap::{Args, Parser, Subcommand};
use conductor_core::{ExecutionMode, IsolationLevel};
use std::path::PathBuf;

/// Run batches of tasks against routed backends
#[derive(Debug, Parser)]
#[command(name = "conductor", version, about)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute a task batch and print the results as JSON
    Run(RunArgs),
    /// Show the task type and backend chosen for each task without running anything
    Route(RouteArgs),
    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Arguments for `conductor run`
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Task batch file (`[[tasks]]` TOML, or JSON)
    #[arg(short, long)]
    pub tasks: PathBuf,
    /// Configuration file [default: ~/.conductor/config.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Project identifier [default: name of the working directory]
    #[arg(short, long)]
    pub project: Option<String>,
    /// Working directory tasks are isolated under [default: current directory]
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,
    /// Base branch name
    #[arg(short, long, default_value = "main")]
    pub branch: String,
    /// State directory [default: <workdir>/.conductor]
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
    /// Override the execution mode
    #[arg(long)]
    pub mode: Option<ExecutionMode>,
    /// Override the worker pool size
    #[arg(long)]
    pub max_workers: Option<usize>,
    /// Override the isolation level
    #[arg(long)]
    pub isolation: Option<IsolationLevel>,
}

/// Arguments for `conductor route`
#[derive(Debug, Args)]
pub struct RouteArgs {
    /// Task batch file (`[[tasks]]` TOML, or JSON)
    #[arg(short, long)]
    pub tasks: PathBuf,
    /// Configuration file [default: ~/.conductor/config.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// `conductor config` subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a starter configuration file
    Init {
        /// Where to write [default: ~/.conductor/config.toml]
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the effective configuration
    Show {
        /// Configuration file [default: ~/.conductor/config.toml]
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
