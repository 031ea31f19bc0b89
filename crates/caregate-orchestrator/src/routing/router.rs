//! Backend router for tier selection.

use super::catalogue::BackendCatalogue;
use super::complexity::ComplexityClassifier;
use super::cost::{self, DEFAULT_RESPONSE_TOKENS};
use super::types::{BackendProfile, BackendTier, RoutingContext, RoutingDecision, RoutingRule};
use caregate_abstraction::TaskCategory;
use tracing::debug;

/// Chat messages shorter than this go to the low-latency tier.
pub const SHORT_CHAT_LENGTH: usize = 100;
/// Chat messages shorter than this (and not short) go to the mid tier.
pub const MEDIUM_CHAT_LENGTH: usize = 500;

/// Selects a backend for each request from a fixed rule table.
///
/// Selection is pure and total: every context maps to exactly one catalogued
/// backend, and the same context always maps to the same one.
#[derive(Debug, Clone)]
pub struct BackendRouter {
    catalogue: BackendCatalogue,
    classifier: ComplexityClassifier,
    assumed_response_tokens: u64,
}

impl BackendRouter {
    /// Creates a router over the built-in catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalogue(BackendCatalogue::default())
    }

    /// Creates a router over a custom catalogue.
    #[must_use]
    pub fn with_catalogue(catalogue: BackendCatalogue) -> Self {
        Self {
            catalogue,
            classifier: ComplexityClassifier::new(),
            assumed_response_tokens: DEFAULT_RESPONSE_TOKENS,
        }
    }

    /// Sets the response length assumed by cost estimates.
    #[must_use]
    pub fn with_assumed_response_tokens(mut self, tokens: u64) -> Self {
        self.assumed_response_tokens = tokens;
        self
    }

    /// Replaces the complexity classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: ComplexityClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// The catalogue this router selects from.
    pub fn catalogue(&self) -> &BackendCatalogue {
        &self.catalogue
    }

    /// The response length assumed by cost estimates.
    pub fn assumed_response_tokens(&self) -> u64 {
        self.assumed_response_tokens
    }

    /// Matches a context against the rule table.
    ///
    /// An unclassified context is treated as not complex.
    pub fn select(&self, ctx: &RoutingContext) -> (&BackendProfile, RoutingRule) {
        let complex = ctx.is_complex();

        let (profile, rule) = match ctx.category {
            TaskCategory::Compliance => (self.top(), RoutingRule::ForcedTopTier),
            TaskCategory::Chat if complex || ctx.is_high_priority() => {
                (self.top(), RoutingRule::ForcedTopTier)
            }
            TaskCategory::Title => (self.catalogue.cheapest(), RoutingRule::Title),
            TaskCategory::Document | TaskCategory::Analysis if complex => {
                (self.top(), RoutingRule::DeepAnalysis)
            }
            TaskCategory::Document | TaskCategory::Analysis => {
                (self.catalogue.for_tier(BackendTier::Mid), RoutingRule::StandardAnalysis)
            }
            TaskCategory::Chat if ctx.message_length < SHORT_CHAT_LENGTH => {
                (self.catalogue.for_tier(BackendTier::LowLatency), RoutingRule::ShortChat)
            }
            TaskCategory::Chat if ctx.message_length < MEDIUM_CHAT_LENGTH => {
                (self.catalogue.for_tier(BackendTier::Mid), RoutingRule::MediumChat)
            }
            TaskCategory::Chat => (self.top(), RoutingRule::LongChat),
        };

        debug!(
            category = %ctx.category,
            message_length = ctx.message_length,
            backend = %profile.id,
            rule = %rule,
            "Selected backend"
        );

        (profile, rule)
    }

    /// Returns the identifier of the backend that should serve a context.
    pub fn select_backend(&self, ctx: &RoutingContext) -> &str {
        &self.select(ctx).0.id
    }

    /// Estimates the cost of sending `message` to `backend_id`.
    ///
    /// Unknown identifiers are priced at the top-tier rate.
    pub fn estimate_cost(&self, message: &str, backend_id: &str) -> f64 {
        self.estimate_cost_with(message, backend_id, self.assumed_response_tokens)
    }

    /// Estimates cost with an explicit assumed response length.
    pub fn estimate_cost_with(&self, message: &str, backend_id: &str, assumed_response_tokens: u64) -> f64 {
        let rate = self
            .catalogue
            .get(backend_id)
            .unwrap_or_else(|| self.top())
            .cost_per_1k_tokens;
        cost::estimate_cost(message, rate, assumed_response_tokens)
    }

    /// Classifies (if needed), selects and prices a request in one step.
    ///
    /// The returned context carries the complexity label that was used.
    pub fn route(&self, message: &str, ctx: RoutingContext) -> (RoutingContext, RoutingDecision) {
        let complexity = ctx
            .complexity
            .unwrap_or_else(|| self.classifier.classify(message, ctx.category));
        let ctx = ctx.with_complexity(complexity);

        let (profile, rule) = self.select(&ctx);
        let estimated_cost =
            cost::estimate_cost(message, profile.cost_per_1k_tokens, self.assumed_response_tokens);

        let decision = RoutingDecision {
            backend: profile.id.clone(),
            tier: profile.tier,
            rule,
            complexity,
            estimated_cost,
        };
        (ctx, decision)
    }

    fn top(&self) -> &BackendProfile {
        self.catalogue.for_tier(BackendTier::Top)
    }
}

impl Default for BackendRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caregate_abstraction::{Complexity, Priority};

    fn ctx(category: TaskCategory, len: usize) -> RoutingContext {
        RoutingContext::new(category, "").with_message_length(len)
    }

    #[test]
    fn test_compliance_always_top_tier() {
        let router = BackendRouter::new();
        let (profile, rule) = router.select(&ctx(TaskCategory::Compliance, 5).with_complexity(Complexity::Simple));
        assert_eq!(profile.tier, BackendTier::Top);
        assert_eq!(rule, RoutingRule::ForcedTopTier);
    }

    #[test]
    fn test_high_priority_short_chat_goes_top() {
        let router = BackendRouter::new();
        let context = ctx(TaskCategory::Chat, 10).with_priority(Priority::High);
        assert_eq!(router.select_backend(&context), "claude-3-opus");
    }

    #[test]
    fn test_complex_chat_goes_top() {
        let router = BackendRouter::new();
        let context = ctx(TaskCategory::Chat, 20).with_complexity(Complexity::Complex);
        assert_eq!(router.select(&context).1, RoutingRule::ForcedTopTier);
    }

    #[test]
    fn test_title_uses_cheapest_regardless_of_length() {
        let router = BackendRouter::new();
        for len in [1, 99, 5_000, 100_000] {
            let context = ctx(TaskCategory::Title, len).with_complexity(Complexity::Complex);
            assert_eq!(router.select_backend(&context), "claude-3-haiku");
        }
    }

    #[test]
    fn test_document_and_analysis_tiers() {
        let router = BackendRouter::new();
        for category in [TaskCategory::Document, TaskCategory::Analysis] {
            let complex = ctx(category, 50).with_complexity(Complexity::Complex);
            let medium = ctx(category, 50).with_complexity(Complexity::Medium);
            assert_eq!(router.select(&complex).1, RoutingRule::DeepAnalysis);
            assert_eq!(router.select(&medium).0.tier, BackendTier::Mid);
        }
    }

    #[test]
    fn test_chat_length_bands() {
        let router = BackendRouter::new();
        let short = ctx(TaskCategory::Chat, 99).with_complexity(Complexity::Medium);
        let medium = ctx(TaskCategory::Chat, 100).with_complexity(Complexity::Medium);
        let long = ctx(TaskCategory::Chat, 500).with_complexity(Complexity::Medium);
        assert_eq!(router.select(&short).1, RoutingRule::ShortChat);
        assert_eq!(router.select(&medium).1, RoutingRule::MediumChat);
        assert_eq!(router.select(&long).1, RoutingRule::LongChat);
        assert_eq!(router.select(&long).0.tier, BackendTier::Top);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let router = BackendRouter::new();
        let context = ctx(TaskCategory::Chat, 250).with_priority(Priority::Low);
        assert_eq!(router.select_backend(&context), router.select_backend(&context));
    }

    #[test]
    fn test_route_classifies_when_unlabelled() {
        let router = BackendRouter::new();
        let message = "Compare our fall rates with last quarter";
        let (ctx, decision) = router.route(message, RoutingContext::new(TaskCategory::Chat, message));
        assert_eq!(ctx.complexity, Some(Complexity::Complex));
        assert_eq!(decision.complexity, Complexity::Complex);
        assert_eq!(decision.backend, "claude-3-opus");
        assert!(decision.estimated_cost > 0.0);
    }

    #[test]
    fn test_route_keeps_existing_label() {
        let router = BackendRouter::new();
        let message = "Compare our fall rates with last quarter";
        let context = RoutingContext::new(TaskCategory::Chat, message).with_complexity(Complexity::Simple);
        let (_, decision) = router.route(message, context);
        assert_eq!(decision.rule, RoutingRule::ShortChat);
    }

    #[test]
    fn test_estimate_cost_uses_backend_rate() {
        let router = BackendRouter::new();
        let message = "x".repeat(400);
        let opus = router.estimate_cost(&message, "claude-3-opus");
        let haiku = router.estimate_cost(&message, "claude-3-haiku");
        assert!((opus - 0.027).abs() < 1e-12);
        assert!((haiku - 0.00045).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_backend_priced_at_top_tier() {
        let router = BackendRouter::new();
        assert_eq!(
            router.estimate_cost("hello", "no-such-backend"),
            router.estimate_cost("hello", "claude-3-opus")
        );
    }

    #[test]
    fn test_assumed_response_tokens_override() {
        let router = BackendRouter::new().with_assumed_response_tokens(1000);
        assert_eq!(router.assumed_response_tokens(), 1000);
        assert!((router.estimate_cost("", "claude-3-opus") - 0.045).abs() < 1e-12);
    }
}
