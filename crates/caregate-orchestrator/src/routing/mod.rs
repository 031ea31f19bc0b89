//! Cost-aware backend routing.
//!
//! A request is labelled by the complexity classifier, matched against a fixed
//! rule table to pick a catalogue tier, and priced with a per-1k-token estimate.

pub mod catalogue;
pub mod complexity;
pub mod cost;
pub mod router;
pub mod types;

pub use catalogue::{BackendCatalogue, CatalogueError};
pub use complexity::ComplexityClassifier;
pub use cost::{DEFAULT_RESPONSE_TOKENS, estimate_cost, estimate_input_tokens};
pub use router::BackendRouter;
pub use types::{BackendProfile, BackendTier, RoutingContext, RoutingDecision, RoutingRule};
