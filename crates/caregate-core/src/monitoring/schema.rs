//! Database schema for the routing log.

use super::error::Result;
use rusqlite::Connection;

/// Initializes the routing log schema.
///
/// Timestamps are stored as Unix epoch milliseconds.
///
/// # Errors
/// Returns error if schema creation fails
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS routing_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id TEXT NOT NULL,
            backend TEXT NOT NULL,
            category TEXT NOT NULL,
            complexity TEXT,
            message_length INTEGER NOT NULL,
            estimated_cost REAL NOT NULL DEFAULT 0.0,
            timestamp INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_routing_log_timestamp
         ON routing_log(timestamp)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_routing_log_conversation
         ON routing_log(conversation_id)",
        [],
    )?;

    Ok(())
}
