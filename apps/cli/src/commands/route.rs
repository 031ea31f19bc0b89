//! `caregate route` - classify, route and price a message.

use anyhow::{Context, Result};
use caregate_abstraction::{Priority, RoutingLogSink, TaskCategory};
use caregate_core::admission::AdmissionController;
use caregate_core::monitoring::{MemoryRoutingLog, SqliteRoutingLog};
use caregate_core::{Config, Gateway, RouteRequest};
use caregate_orchestrator::DecisionLogger;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the route command
#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Message text
    pub message: String,

    /// Task category (chat, title, document, analysis, compliance)
    #[arg(long, default_value = "chat")]
    pub category: TaskCategory,

    /// Declared priority (low, medium, high)
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Caller role
    #[arg(long)]
    pub role: Option<String>,

    /// Conversation identifier recorded in the routing log
    #[arg(long, default_value = "cli")]
    pub conversation: String,

    /// Mark as the first message of the conversation
    #[arg(long)]
    pub first: bool,

    /// Routing log database (overrides storage.database_path)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute route command
pub async fn execute(config: &Config, args: RouteArgs) -> Result<()> {
    let db_path = args.db.clone().or_else(|| config.storage.database_path.clone());
    let sink: Arc<dyn RoutingLogSink> = match &db_path {
        Some(path) => Arc::new(
            SqliteRoutingLog::open(path)
                .with_context(|| format!("Failed to open routing log at {}", path.display()))?,
        ),
        None => Arc::new(MemoryRoutingLog::new()),
    };

    let gateway = Gateway::new(
        AdmissionController::new(config.quota_table()?),
        config.router()?,
        DecisionLogger::with_capacity(sink, config.routing.log_channel_capacity),
    );

    let mut request = RouteRequest::new(args.conversation, args.message, args.category).first_message(args.first);
    if let Some(priority) = args.priority {
        request = request.with_priority(priority);
    }
    if let Some(role) = args.role {
        request = request.with_caller_role(role);
    }

    let decision = gateway.route(&request);
    gateway.shutdown().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    println!("{}", "caregate route".bold().cyan());
    println!();
    println!("  Category:   {}", request.category);
    println!("  Complexity: {}", decision.complexity);
    println!("  Rule:       {}", decision.rule);
    println!("  Backend:    {} ({})", decision.backend.green(), decision.tier);
    println!("  Est. cost:  ${:.6}", decision.estimated_cost);
    match db_path {
        Some(path) => println!("  {} Logged to {}", "✓".green(), path.display()),
        None => println!("  {}", "Not persisted (no routing database configured)".dimmed()),
    }
    Ok(())
}
