//! Types for the backend routing system.

use caregate_abstraction::{Complexity, Priority, TaskCategory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capability tier of a catalogued backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendTier {
    /// Highest capability, highest cost.
    Top,
    /// Balanced capability and cost.
    Mid,
    /// Fast and cheap, for short conversational turns.
    LowLatency,
}

impl BackendTier {
    /// Stable label used in config files and telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendTier::Top => "top",
            BackendTier::Mid => "mid",
            BackendTier::LowLatency => "low_latency",
        }
    }
}

impl fmt::Display for BackendTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top" => Ok(BackendTier::Top),
            "mid" => Ok(BackendTier::Mid),
            "low_latency" | "low-latency" => Ok(BackendTier::LowLatency),
            _ => Err(format!("unknown backend tier '{}'", s)),
        }
    }
}

/// Static catalogue entry describing one inference backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendProfile {
    /// Backend identifier handed to the inference collaborator.
    pub id: String,
    /// Capability tier.
    pub tier: BackendTier,
    /// Blended cost in USD per 1000 tokens.
    pub cost_per_1k_tokens: f64,
    /// Maximum tokens the backend accepts per response.
    pub max_tokens: u32,
    /// Free-text strength tags.
    #[serde(default)]
    pub strengths: Vec<String>,
    /// Free-text weakness tags.
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

impl BackendProfile {
    /// Creates a profile without tags.
    pub fn new(id: impl Into<String>, tier: BackendTier, cost_per_1k_tokens: f64, max_tokens: u32) -> Self {
        Self {
            id: id.into(),
            tier,
            cost_per_1k_tokens,
            max_tokens,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
        }
    }

    /// Sets the strength and weakness tags.
    #[must_use]
    pub fn with_tags(mut self, strengths: &[&str], weaknesses: &[&str]) -> Self {
        self.strengths = strengths.iter().map(|s| (*s).to_string()).collect();
        self.weaknesses = weaknesses.iter().map(|s| (*s).to_string()).collect();
        self
    }
}

/// Per-request facts the router decides on.
///
/// Built by the calling handler from the request payload. `complexity` is
/// `None` until the classifier has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingContext {
    /// Message length in characters.
    pub message_length: usize,
    /// Whether this is the first message of the conversation.
    pub first_message: bool,
    /// Role of the caller, as reported by the identity collaborator.
    pub caller_role: Option<String>,
    /// Task category.
    pub category: TaskCategory,
    /// Complexity label, if already classified.
    pub complexity: Option<Complexity>,
    /// Declared priority.
    pub priority: Option<Priority>,
}

impl RoutingContext {
    /// Creates an unclassified context for a message.
    pub fn new(category: TaskCategory, message: &str) -> Self {
        Self {
            message_length: message.chars().count(),
            first_message: false,
            caller_role: None,
            category,
            complexity: None,
            priority: None,
        }
    }

    /// Sets the declared priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the complexity label.
    #[must_use]
    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    /// Sets the caller role.
    #[must_use]
    pub fn with_caller_role(mut self, role: impl Into<String>) -> Self {
        self.caller_role = Some(role.into());
        self
    }

    /// Marks the context as the first message of a conversation.
    #[must_use]
    pub fn first_message(mut self, first: bool) -> Self {
        self.first_message = first;
        self
    }

    /// Overrides the message length.
    #[must_use]
    pub fn with_message_length(mut self, length: usize) -> Self {
        self.message_length = length;
        self
    }

    pub(crate) fn is_complex(&self) -> bool {
        self.complexity == Some(Complexity::Complex)
    }

    pub(crate) fn is_high_priority(&self) -> bool {
        self.priority == Some(Priority::High)
    }
}

/// Which row of the routing table matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingRule {
    /// Compliance work, or chat that is complex or high priority.
    ForcedTopTier,
    /// Title generation always uses the cheapest backend.
    Title,
    /// Complex document or analysis work.
    DeepAnalysis,
    /// Document or analysis work that is not complex.
    StandardAnalysis,
    /// Short chat turn.
    ShortChat,
    /// Medium-length chat turn.
    MediumChat,
    /// Long chat turn.
    LongChat,
}

impl fmt::Display for RoutingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RoutingRule::ForcedTopTier => "forced_top_tier",
            RoutingRule::Title => "title",
            RoutingRule::DeepAnalysis => "deep_analysis",
            RoutingRule::StandardAnalysis => "standard_analysis",
            RoutingRule::ShortChat => "short_chat",
            RoutingRule::MediumChat => "medium_chat",
            RoutingRule::LongChat => "long_chat",
        };
        f.write_str(label)
    }
}

/// Outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    /// Selected backend identifier.
    pub backend: String,
    /// Tier of the selected backend.
    pub tier: BackendTier,
    /// Rule that selected it.
    pub rule: RoutingRule,
    /// Complexity label used for the decision.
    pub complexity: Complexity,
    /// Estimated cost in USD.
    pub estimated_cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_tier_labels() {
        assert_eq!(BackendTier::LowLatency.to_string(), "low_latency");
        assert_eq!("low-latency".parse::<BackendTier>().unwrap(), BackendTier::LowLatency);
        assert_eq!("TOP".parse::<BackendTier>().unwrap(), BackendTier::Top);
        assert!("premium".parse::<BackendTier>().is_err());
    }

    #[test]
    fn test_context_counts_characters_not_bytes() {
        let ctx = RoutingContext::new(TaskCategory::Chat, "résumé");
        assert_eq!(ctx.message_length, 6);
        assert_eq!(ctx.complexity, None);
        assert!(!ctx.first_message);
    }

    #[test]
    fn test_context_builders() {
        let ctx = RoutingContext::new(TaskCategory::Analysis, "x")
            .with_priority(Priority::High)
            .with_complexity(Complexity::Complex)
            .with_caller_role("administrator")
            .first_message(true);
        assert!(ctx.is_complex());
        assert!(ctx.is_high_priority());
        assert_eq!(ctx.caller_role.as_deref(), Some("administrator"));
        assert!(ctx.first_message);
    }
}
