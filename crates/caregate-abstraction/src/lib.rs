//! Shared vocabulary for Caregate.
//!
//! This crate defines the request categories, complexity labels and priorities
//! that the admission and routing layers agree on, plus the seam to the external
//! store that receives routing decisions for analytics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a label does not name a known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    /// Which vocabulary was being parsed (e.g. "task category").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

/// The kind of work an inbound chat/analysis request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    /// Free-form conversation.
    Chat,
    /// Conversation title generation.
    Title,
    /// Document drafting or summarisation.
    Document,
    /// General analysis.
    Analysis,
    /// Regulatory compliance questions.
    Compliance,
}

impl TaskCategory {
    /// All categories, in declaration order.
    pub const ALL: [Self; 5] =
        [Self::Chat, Self::Title, Self::Document, Self::Analysis, Self::Compliance];

    /// Stable lowercase label used in storage and headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Title => "title",
            Self::Document => "document",
            Self::Analysis => "analysis",
            Self::Compliance => "compliance",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "title" => Ok(Self::Title),
            "document" => Ok(Self::Document),
            "analysis" => Ok(Self::Analysis),
            "compliance" => Ok(Self::Compliance),
            _ => Err(UnknownVariant::new("task category", s)),
        }
    }
}

/// Coarse complexity label produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Short or definitional requests.
    Simple,
    /// Everything between simple and complex.
    Medium,
    /// Long or analytically demanding requests.
    Complex,
}

impl Complexity {
    /// Stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "medium" => Ok(Self::Medium),
            "complex" => Ok(Self::Complex),
            _ => Err(UnknownVariant::new("complexity", s)),
        }
    }
}

/// Priority declared by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Best effort.
    Low,
    /// Normal.
    Medium,
    /// Latency or quality sensitive.
    High,
}

impl Priority {
    /// Stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownVariant::new("priority", s)),
        }
    }
}

/// One routing decision as written to the analytics store.
///
/// Entries are append-only: the logger writes them and the stats aggregator
/// reads them back; nothing in the request path ever reads one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingLogEntry {
    /// Conversation the request belongs to.
    pub conversation_id: String,
    /// Backend identifier the router selected.
    pub backend: String,
    /// Task category of the request.
    pub category: TaskCategory,
    /// Complexity label, if the request was classified.
    pub complexity: Option<Complexity>,
    /// Message length in characters.
    pub message_length: usize,
    /// Estimated cost in USD.
    pub estimated_cost: f64,
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
}

/// Errors raised by a routing log store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The entry could not be written.
    #[error("routing log write failed: {0}")]
    Write(String),

    /// Entries could not be read back.
    #[error("routing log read failed: {0}")]
    Read(String),
}

/// External persistence collaborator for routing decisions.
///
/// Implementations must be `Send + Sync` so that a single store can be shared
/// between the background logger and the stats aggregator.
#[async_trait]
pub trait RoutingLogSink: Send + Sync {
    /// Appends one entry.
    ///
    /// # Errors
    /// Returns `SinkError::Write` if the store rejects the entry.
    async fn append(&self, entry: &RoutingLogEntry) -> Result<(), SinkError>;

    /// Returns every entry with `timestamp >= since`, oldest first.
    ///
    /// # Errors
    /// Returns `SinkError::Read` if the store cannot be queried.
    async fn entries_since(&self, since: DateTime<Utc>) -> Result<Vec<RoutingLogEntry>, SinkError>;
}
