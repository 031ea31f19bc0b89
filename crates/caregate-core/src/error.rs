//! Error types for Caregate Core.

use crate::config::ConfigError;
use crate::monitoring::MonitoringError;
use caregate_abstraction::SinkError;
use thiserror::Error;

/// Core error type for Caregate operations.
///
/// Quota denials are not errors; they are the `Rejected` outcome of
/// admission.
#[derive(Error, Debug)]
pub enum CaregateError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Routing log storage errors
    #[error("Storage error: {0}")]
    Monitoring(#[from] MonitoringError),

    /// Routing log read/write errors
    #[error("Routing log error: {0}")]
    Sink(#[from] SinkError),
}

/// Result type alias for Caregate operations.
pub type Result<T> = std::result::Result<T, CaregateError>;
