//! Reporting over logged routing decisions.

pub mod routing_stats;

pub use routing_stats::{RoutingStats, RoutingStatsService, Timeframe};
