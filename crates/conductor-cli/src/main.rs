//! Conductor CLI - run task batches against routed backends
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        reason = "Allow for tests"
    )
)]

use anyhow::Result;
use clap::Parser as _;
use cli::{Cli, Command, ConfigCommand};
use std::io::stderr;
use std::process::ExitCode;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

mod cli;
mod handlers;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "conductor_executor=info,conductor_routing=info,conductor_cli=info".into()
        }))
        .with(
            fmt::layer()
                .with_writer(stderr)
                .with_target(true)
                .with_level(true),
        )
        .init();

    match cli.command {
        Command::Run(args) => handlers::handle_run(args).await,
        Command::Route(args) => handlers::handle_route(&args).await,
        Command::Config(ConfigCommand::Init { path, force }) => {
            handlers::handle_config_init(path, force)
        }
        Command::Config(ConfigCommand::Show { config }) => {
            handlers::handle_config_show(config.as_deref())
        }
    }
}
