//! Routing log storage errors.

use caregate_abstraction::SinkError;
use std::io;

/// Routing log storage errors.
#[derive(Debug, thiserror::Error)]
pub enum MonitoringError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error while preparing the database file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stored row could not be decoded.
    #[error("corrupt routing log row: {0}")]
    Corrupt(String),

    /// The blocking database task failed.
    #[error("database task failed: {0}")]
    Task(String),
}

/// Result type for routing log storage.
pub type Result<T> = std::result::Result<T, MonitoringError>;

impl MonitoringError {
    /// Maps into the write side of the sink contract.
    pub(crate) fn into_write(self) -> SinkError {
        SinkError::Write(self.to_string())
    }

    /// Maps into the read side of the sink contract.
    pub(crate) fn into_read(self) -> SinkError {
        SinkError::Read(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitoring_error_display() {
        let error = MonitoringError::Corrupt("unknown category 'x'".to_string());
        let msg = format!("{}", error);
        assert!(msg.contains("corrupt routing log row"));
        assert!(msg.contains("unknown category"));
    }

    #[test]
    fn test_monitoring_error_from_database_error() {
        let db_error = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            None,
        );
        let monitoring_error: MonitoringError = db_error.into();
        assert!(matches!(monitoring_error, MonitoringError::Database(_)));
    }

    #[test]
    fn test_sink_error_mapping() {
        let err = MonitoringError::Task("cancelled".to_string());
        assert!(matches!(err.into_write(), SinkError::Write(msg) if msg.contains("cancelled")));
        let err = MonitoringError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(err.into_read(), SinkError::Read(_)));
    }
}
