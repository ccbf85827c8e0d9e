//! Library entrypoint for the tinywiki server so tests can drive the router
//! and commands without spawning the binary.

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod forms;
pub mod routes;
pub mod server;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::{cli::Command, config::ServerConfig};

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Run a CLI invocation (parsed by the caller).
pub async fn run_with_cli(cli: cli::Cli) -> Result<()> {
    init_tracing(cli.verbose)?;

    match &cli.command {
        Command::Serve(args) => {
            let cfg = ServerConfig::from_cli(&cli, args)?;
            server::serve(cfg).await
        }
        Command::Init { path } => commands::init_project(path.as_deref()),
        Command::User(command) => commands::run_user_command(&cli.config, command.clone()),
    }
}
