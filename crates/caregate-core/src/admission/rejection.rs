//! Rejection responses and rate-limit headers.

use super::limiter::RateLimitDecision;
use http::header::{CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Quota limit header.
pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
/// Remaining requests header.
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// Window end header, in epoch seconds.
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Error code carried in every rejection body.
pub const RATE_LIMIT_ERROR_CODE: &str = "rate_limit_exceeded";

/// Outcome of [`AdmissionController::enforce`](super::AdmissionController::enforce).
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Proceed; attach success headers from the decision.
    Admitted(RateLimitDecision),
    /// Stop and return the rejection.
    Rejected(Rejection),
}

impl Admission {
    /// Whether the request may proceed.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

/// JSON body of a 429 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionBody {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable explanation.
    pub message: String,
    /// Seconds until the caller may retry.
    #[serde(rename = "retryAfter")]
    pub retry_after: u64,
}

/// A complete 429 response for a denied request.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Always 429.
    pub status: StatusCode,
    /// Response body.
    pub body: RejectionBody,
    /// Rate-limit and retry headers.
    pub headers: HeaderMap,
}

impl Rejection {
    /// Builds the rejection for a denied decision.
    pub fn from_decision(decision: &RateLimitDecision) -> Self {
        let retry_after = decision.retry_after_secs();
        let body = RejectionBody {
            error: RATE_LIMIT_ERROR_CODE.to_string(),
            message: format!(
                "Too many {} requests. Please try again in {} seconds.",
                decision.quota, retry_after
            ),
            retry_after,
        };

        let mut headers = HeaderMap::new();
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from_static("0"));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_epoch_secs()));
        headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));

        Self { status: StatusCode::TOO_MANY_REQUESTS, body, headers }
    }

    /// Body serialized as JSON.
    pub fn body_json(&self) -> String {
        serde_json::json!({
            "error": self.body.error,
            "message": self.body.message,
            "retryAfter": self.body.retry_after,
        })
        .to_string()
    }

    /// Converts into an HTTP response with a JSON body.
    pub fn into_response<B: From<String>>(self) -> Response<B> {
        let body = self.body_json();
        let mut response = Response::new(B::from(body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

/// Success-path headers for an admitted request.
pub fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    apply_rate_limit_headers(decision, &mut headers);
    headers
}

/// Writes the success-path headers into an existing header map.
pub fn apply_rate_limit_headers(decision: &RateLimitDecision, headers: &mut HeaderMap) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_epoch_secs()));
}
