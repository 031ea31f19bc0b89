//! Fire-and-forget logging of routing decisions.
//!
//! Callers hand entries to a bounded channel and return immediately. A single
//! worker task drains the channel into the configured [`RoutingLogSink`]. Sink
//! failures and a full channel are reported as warnings and otherwise dropped.

use crate::routing::RoutingContext;
use caregate_abstraction::{RoutingLogEntry, RoutingLogSink};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default number of entries that may wait for the worker.
pub const DEFAULT_LOG_CAPACITY: usize = 1024;

/// Background writer for routing log entries.
pub struct DecisionLogger {
    sender: mpsc::Sender<RoutingLogEntry>,
    worker: JoinHandle<()>,
    dropped: Arc<AtomicU64>,
}

impl DecisionLogger {
    /// Starts a logger with the default queue capacity.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(sink: Arc<dyn RoutingLogSink>) -> Self {
        Self::with_capacity(sink, DEFAULT_LOG_CAPACITY)
    }

    /// Starts a logger with an explicit queue capacity (at least 1).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_capacity(sink: Arc<dyn RoutingLogSink>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<RoutingLogEntry>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(entry) = receiver.recv().await {
                match sink.append(&entry).await {
                    Ok(()) => debug!(
                        conversation_id = %entry.conversation_id,
                        backend = %entry.backend,
                        "Routing decision logged"
                    ),
                    Err(e) => warn!(
                        conversation_id = %entry.conversation_id,
                        backend = %entry.backend,
                        error = %e,
                        "Failed to log routing decision"
                    ),
                }
            }
        });

        Self { sender, worker, dropped: Arc::new(AtomicU64::new(0)) }
    }

    /// Queues a decision for logging without waiting.
    pub fn log_decision(&self, conversation_id: &str, backend_id: &str, ctx: &RoutingContext, cost: f64) {
        self.record(RoutingLogEntry {
            conversation_id: conversation_id.to_string(),
            backend: backend_id.to_string(),
            category: ctx.category,
            complexity: ctx.complexity,
            message_length: ctx.message_length,
            estimated_cost: cost,
            timestamp: Utc::now(),
        });
    }

    /// Queues a prepared entry without waiting.
    ///
    /// If the queue is full or the worker has stopped the entry is dropped
    /// with a warning.
    pub fn record(&self, entry: RoutingLogEntry) {
        if let Err(e) = self.sender.try_send(entry) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            let (reason, entry) = match e {
                TrySendError::Full(entry) => ("queue full", entry),
                TrySendError::Closed(entry) => ("logger stopped", entry),
            };
            warn!(
                conversation_id = %entry.conversation_id,
                backend = %entry.backend,
                reason,
                "Dropped routing log entry"
            );
        }
    }

    /// Number of entries dropped because they could not be queued.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stops accepting entries and waits until every queued entry is written.
    pub async fn shutdown(self) {
        let Self { sender, worker, .. } = self;
        drop(sender);
        if let Err(e) = worker.await {
            warn!(error = %e, "Routing log worker ended abnormally");
        }
    }
}

impl std::fmt::Debug for DecisionLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionLogger")
            .field("capacity", &self.sender.max_capacity())
            .field("dropped", &self.dropped())
            .finish_non_exhaustive()
    }
}
