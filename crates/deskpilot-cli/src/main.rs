//! # Deskpilot CLI
//!
//! The main entry point for Deskpilot.

mod cli;
mod commands;
mod repl;
mod runtime;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Default to warn so logs don't drown the status lines.
    // RUST_LOG=info or RUST_LOG=debug for more.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Some(Commands::Run { goal }) => {
            commands::run::run(goal.join(" "), &cli).await?;
        }
        Some(Commands::Settings { key, value }) => {
            commands::settings::run(key.clone(), value.clone(), &cli)?;
        }
        Some(Commands::Providers) => {
            commands::providers::run(&cli)?;
        }
        None => {
            // Default: interactive loop
            repl::run(&cli).await?;
        }
    }

    Ok(())
}
