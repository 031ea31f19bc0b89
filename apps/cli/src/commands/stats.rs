//! `caregate stats` - aggregate the routing log.

use anyhow::{Context, Result, bail};
use caregate_core::monitoring::SqliteRoutingLog;
use caregate_core::{Config, RoutingStats, RoutingStatsService, Timeframe};
use clap::Args;
use colored::Colorize;
use comfy_table::{Table, presets::UTF8_FULL};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the stats command
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Reporting window (day, week, month)
    #[arg(short, long, default_value = "day")]
    pub timeframe: Timeframe,

    /// Routing log database (overrides storage.database_path)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute stats command
pub async fn execute(config: &Config, args: &StatsArgs) -> Result<()> {
    let Some(path) = args.db.clone().or_else(|| config.storage.database_path.clone()) else {
        bail!("No routing database configured. Pass --db or set storage.database_path.");
    };
    if !path.exists() {
        bail!("Routing database {} does not exist. Route some requests first.", path.display());
    }

    let log = SqliteRoutingLog::open(&path)
        .with_context(|| format!("Failed to open routing log at {}", path.display()))?;
    let stats = RoutingStatsService::new(Arc::new(log))
        .aggregate(args.timeframe)
        .await
        .context("Failed to aggregate routing log")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_report(&stats);
    }
    Ok(())
}

fn print_report(stats: &RoutingStats) {
    println!("{}", format!("caregate stats ({})", stats.timeframe).bold().cyan());
    println!();
    println!("  Since:      {}", stats.since.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Requests:   {}", stats.request_count);
    println!("  Total cost: ${:.4}", stats.total_cost);
    println!();

    if stats.request_count == 0 {
        println!("  {}", "No routing decisions in this window.".dimmed());
        return;
    }

    let mut backends = Table::new();
    backends.load_preset(UTF8_FULL);
    backends.set_header(vec!["Backend", "Requests"]);
    for (backend, count) in &stats.by_backend {
        backends.add_row(vec![backend.clone(), count.to_string()]);
    }
    println!("{backends}");

    let mut categories = Table::new();
    categories.load_preset(UTF8_FULL);
    categories.set_header(vec!["Category", "Requests"]);
    for (category, count) in &stats.by_category {
        categories.add_row(vec![category.to_string(), count.to_string()]);
    }
    println!("{categories}");
}
