//! Request cost estimation.

/// Response length assumed when no better estimate is available.
pub const DEFAULT_RESPONSE_TOKENS: u64 = 500;

/// Characters per token used for the input estimate.
const CHARS_PER_TOKEN: u64 = 4;

/// Estimates input tokens as one token per four characters, rounded up.
pub fn estimate_input_tokens(message: &str) -> u64 {
    (message.chars().count() as u64).div_ceil(CHARS_PER_TOKEN)
}

/// Estimates the USD cost of a request at a per-1k-token rate.
///
/// Linear in both the input estimate and `assumed_response_tokens`. Negative
/// or non-finite rates are clamped to zero so the result is never negative.
pub fn estimate_cost(message: &str, cost_per_1k_tokens: f64, assumed_response_tokens: u64) -> f64 {
    let rate = if cost_per_1k_tokens.is_finite() && cost_per_1k_tokens > 0.0 {
        cost_per_1k_tokens
    } else {
        0.0
    };
    let tokens = estimate_input_tokens(message).saturating_add(assumed_response_tokens);
    tokens as f64 / 1000.0 * rate
}
