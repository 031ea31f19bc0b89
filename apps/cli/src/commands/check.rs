//! `caregate check` - run admission checks for a synthetic caller.

use anyhow::{Context, Result};
use caregate_core::admission::{Admission, AdmissionController, QuotaName};
use caregate_core::Config;
use clap::Args;
use colored::Colorize;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Quota to check (chat, search, api, upload, analysis, facility_analysis, export, admin, default)
    #[arg(short, long, default_value = "default")]
    pub quota: QuotaName,

    /// Bearer token presented by the caller
    #[arg(long)]
    pub token: Option<String>,

    /// X-Forwarded-For value presented by the caller
    #[arg(long)]
    pub forwarded_for: Option<String>,

    /// Number of consecutive requests to simulate
    #[arg(short = 'n', long, default_value = "1")]
    pub count: u32,

    /// Output as JSON lines
    #[arg(long)]
    pub json: bool,
}

fn request_headers(args: &CheckArgs) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(token) = &args.token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token)).context("Token is not a valid header value")?;
        headers.insert(AUTHORIZATION, value);
    }
    if let Some(forwarded) = &args.forwarded_for {
        let value = HeaderValue::from_str(forwarded).context("Forwarded-for is not a valid header value")?;
        headers.insert("x-forwarded-for", value);
    }
    Ok(headers)
}

/// Execute check command
pub fn execute(config: &Config, args: &CheckArgs) -> Result<()> {
    let controller = AdmissionController::new(config.quota_table()?);
    let headers = request_headers(args)?;
    let client = controller.resolve_client(&headers, args.quota);

    if !args.json {
        println!("{}", "caregate check".bold().cyan());
        println!("  Quota:  {}", args.quota);
        println!("  Client: {}", client);
        println!();
    }

    for attempt in 1..=args.count {
        match controller.enforce(&headers, args.quota) {
            Admission::Admitted(decision) => {
                if args.json {
                    println!("{}", serde_json::to_string(&decision)?);
                } else {
                    println!(
                        "  {} #{} admitted (remaining {}/{})",
                        "✓".green(),
                        attempt,
                        decision.remaining,
                        decision.limit
                    );
                }
            }
            Admission::Rejected(rejection) => {
                if args.json {
                    println!("{}", rejection.body_json());
                } else {
                    println!(
                        "  {} #{} rejected with {}: {}",
                        "✗".red(),
                        attempt,
                        rejection.status.as_u16(),
                        rejection.body_json()
                    );
                }
            }
        }
    }
    Ok(())
}
