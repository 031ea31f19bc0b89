//! Backend routing for Caregate.
//!
//! Classifies inbound chat/analysis requests, picks the inference backend that
//! should serve them, estimates what that will cost and hands the decision to a
//! background logger. Nothing here calls a backend; it only decides.

pub mod decision_log;
pub mod routing;

pub use decision_log::{DEFAULT_LOG_CAPACITY, DecisionLogger};
pub use routing::{
    BackendCatalogue, BackendProfile, BackendRouter, BackendTier, CatalogueError,
    ComplexityClassifier, RoutingContext, RoutingDecision, RoutingRule, estimate_cost,
    estimate_input_tokens,
};
