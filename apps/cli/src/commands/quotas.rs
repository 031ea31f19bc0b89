//! `caregate quotas` - show effective quota limits.

use anyhow::Result;
use caregate_core::Config;
use clap::Args;
use colored::Colorize;
use comfy_table::{Table, presets::UTF8_FULL};

/// Arguments for the quotas command
#[derive(Args, Debug)]
pub struct QuotasArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute quotas command
pub fn execute(config: &Config, args: &QuotasArgs) -> Result<()> {
    let table = config.quota_table()?;

    if args.json {
        let rows: Vec<serde_json::Value> = table
            .iter()
            .map(|(name, quota)| {
                serde_json::json!({
                    "name": name,
                    "max_requests": quota.max_requests,
                    "window_ms": quota.window_ms,
                    "key_strategy": quota.key_strategy,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", "caregate quotas".bold().cyan());
    println!();

    let mut output = Table::new();
    output.load_preset(UTF8_FULL);
    output.set_header(vec!["Quota", "Max requests", "Window", "Keyed by"]);
    for (name, quota) in table.iter() {
        output.add_row(vec![
            name.to_string(),
            quota.max_requests.to_string(),
            format_window(quota.window_ms),
            format!("{:?}", quota.key_strategy).to_lowercase(),
        ]);
    }
    println!("{output}");
    Ok(())
}

fn format_window(window_ms: u64) -> String {
    let secs = window_ms / 1000;
    if window_ms % 3_600_000 == 0 {
        format!("{}h", secs / 3600)
    } else if window_ms % 60_000 == 0 {
        format!("{}m", secs / 60)
    } else if window_ms % 1000 == 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", window_ms)
    }
}
