//! Caregate Core - admission control and routing telemetry for care-home AI requests.
//!
//! This crate provides:
//! - Per-client fixed-window admission control over named quotas
//! - Tower middleware that turns denials into 429 responses
//! - Layered configuration
//! - SQLite routing log storage and routing statistics
//! - The [`Gateway`] facade tying admission to backend routing
//!
//! # Example
//!
//! ```rust,no_run
//! use caregate_core::{Config, Gateway, RouteRequest, monitoring::SqliteRoutingLog};
//! use caregate_abstraction::TaskCategory;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> caregate_core::Result<()> {
//!     let config = Config::load(None)?;
//!     let log = Arc::new(SqliteRoutingLog::open_in_memory()?);
//!     let gateway = Gateway::from_config(&config, log)?;
//!     let decision = gateway.route(&RouteRequest::new("conv-1", "Hello", TaskCategory::Chat));
//!     println!("{}", decision.backend);
//!     gateway.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod admission;
pub mod analytics;
pub mod config;
pub mod error;
pub mod gateway;
pub mod monitoring;
pub mod server;

pub use admission::{Admission, AdmissionController, ClientKey, QuotaName, QuotaTable, RateLimitDecision, Rejection};
pub use analytics::{RoutingStats, RoutingStatsService, Timeframe};
pub use config::{Config, ConfigError};
pub use error::{CaregateError, Result};
pub use gateway::{Gateway, RouteRequest};
pub use server::AdmissionLayer;
