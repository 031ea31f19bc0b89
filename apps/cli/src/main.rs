//! Caregate CLI - operate and inspect the admission and routing core.
//!
//! Provides the `caregate` command for checking quotas, dry-running routing
//! decisions and reporting on the routing log.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use commands::{check, quotas, route, stats};

/// Caregate - admission control and cost-aware backend routing
#[derive(Parser, Debug)]
#[command(name = "caregate", author, version, about = "Caregate - admission control and cost-aware backend routing")]
struct Args {
    /// Configuration file (TOML); CAREGATE__* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the effective quota table
    Quotas(quotas::QuotasArgs),

    /// Run admission checks for a synthetic caller
    Check(check::CheckArgs),

    /// Classify, route and price a message
    Route(route::RouteArgs),

    /// Aggregate the routing log
    Stats(stats::StatsArgs),
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let level: Level = level.parse().with_context(|| format!("Invalid log level '{}'", level))?;
    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("caregate_core={level},caregate_orchestrator={level},warn"))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()?;
    } else {
        registry
            .with(fmt::layer().without_time().with_target(false).with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    let config = caregate_core::Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Quotas(cmd) => quotas::execute(&config, &cmd),
        Command::Check(cmd) => check::execute(&config, &cmd),
        Command::Route(cmd) => route::execute(&config, cmd).await,
        Command::Stats(cmd) => stats::execute(&config, &cmd).await,
    }
}
