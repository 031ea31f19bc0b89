//! Routing log stores.

use super::error::{MonitoringError, Result};
use super::schema::initialize_schema;
use async_trait::async_trait;
use caregate_abstraction::{Complexity, RoutingLogEntry, RoutingLogSink, SinkError, TaskCategory};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// SQLite-backed routing log.
///
/// Queries run on the blocking pool so async callers are never stalled by
/// disk I/O.
#[derive(Clone)]
pub struct SqliteRoutingLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRoutingLog {
    /// Opens (or creates) a routing log database file.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened routing log database");
        Self::from_connection(conn)
    }

    /// Opens a private in-memory routing log.
    ///
    /// # Errors
    /// Returns error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        initialize_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| MonitoringError::Task("routing log connection lock poisoned".to_string()))
    }

    /// Appends one entry.
    ///
    /// # Errors
    /// Returns error if the insert fails.
    pub fn insert(&self, entry: &RoutingLogEntry) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO routing_log
             (conversation_id, backend, category, complexity, message_length, estimated_cost, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.conversation_id,
                entry.backend,
                entry.category.as_str(),
                entry.complexity.map(|c| c.as_str()),
                i64::try_from(entry.message_length).unwrap_or(i64::MAX),
                entry.estimated_cost,
                entry.timestamp.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// Entries with `timestamp >= since`, oldest first.
    ///
    /// # Errors
    /// Returns error if the query fails or a row cannot be decoded.
    pub fn query_since(&self, since: DateTime<Utc>) -> Result<Vec<RoutingLogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT conversation_id, backend, category, complexity, message_length, estimated_cost, timestamp
             FROM routing_log
             WHERE timestamp >= ?1
             ORDER BY timestamp ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![since.timestamp_millis()], |row| {
            Ok(RawRow {
                conversation_id: row.get(0)?,
                backend: row.get(1)?,
                category: row.get(2)?,
                complexity: row.get(3)?,
                message_length: row.get(4)?,
                estimated_cost: row.get(5)?,
                timestamp_ms: row.get(6)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.decode()?);
        }
        Ok(entries)
    }

    /// Number of stored entries.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM routing_log", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

impl std::fmt::Debug for SqliteRoutingLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRoutingLog").finish_non_exhaustive()
    }
}

struct RawRow {
    conversation_id: String,
    backend: String,
    category: String,
    complexity: Option<String>,
    message_length: i64,
    estimated_cost: f64,
    timestamp_ms: i64,
}

impl RawRow {
    fn decode(self) -> Result<RoutingLogEntry> {
        let category: TaskCategory =
            self.category.parse().map_err(|e| MonitoringError::Corrupt(format!("{}", e)))?;
        let complexity = self
            .complexity
            .map(|c| c.parse::<Complexity>())
            .transpose()
            .map_err(|e| MonitoringError::Corrupt(format!("{}", e)))?;
        let timestamp = DateTime::from_timestamp_millis(self.timestamp_ms).ok_or_else(|| {
            MonitoringError::Corrupt(format!("timestamp out of range: {}", self.timestamp_ms))
        })?;

        Ok(RoutingLogEntry {
            conversation_id: self.conversation_id,
            backend: self.backend,
            category,
            complexity,
            message_length: usize::try_from(self.message_length).unwrap_or(0),
            estimated_cost: self.estimated_cost,
            timestamp,
        })
    }
}

#[async_trait]
impl RoutingLogSink for SqliteRoutingLog {
    async fn append(&self, entry: &RoutingLogEntry) -> std::result::Result<(), SinkError> {
        let store = self.clone();
        let entry = entry.clone();
        tokio::task::spawn_blocking(move || store.insert(&entry))
            .await
            .map_err(|e| MonitoringError::Task(e.to_string()).into_write())?
            .map_err(MonitoringError::into_write)
    }

    async fn entries_since(&self, since: DateTime<Utc>) -> std::result::Result<Vec<RoutingLogEntry>, SinkError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.query_since(since))
            .await
            .map_err(|e| MonitoringError::Task(e.to_string()).into_read())?
            .map_err(MonitoringError::into_read)
    }
}

/// In-memory routing log for tests and embedding without a database.
#[derive(Debug, Default)]
pub struct MemoryRoutingLog {
    entries: Mutex<Vec<RoutingLogEntry>>,
}

impl MemoryRoutingLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entry.
    pub fn entries(&self) -> Vec<RoutingLogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RoutingLogSink for MemoryRoutingLog {
    async fn append(&self, entry: &RoutingLogEntry) -> std::result::Result<(), SinkError> {
        self.entries
            .lock()
            .map_err(|_| SinkError::Write("memory log lock poisoned".to_string()))?
            .push(entry.clone());
        Ok(())
    }

    async fn entries_since(&self, since: DateTime<Utc>) -> std::result::Result<Vec<RoutingLogEntry>, SinkError> {
        let entries = self.entries.lock().map_err(|_| SinkError::Read("memory log lock poisoned".to_string()))?;
        let mut selected: Vec<_> = entries.iter().filter(|e| e.timestamp >= since).cloned().collect();
        selected.sort_by_key(|e| e.timestamp);
        Ok(selected)
    }
}
