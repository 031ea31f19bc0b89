//! Per-client admission control over named quotas.
//!
//! Requests are keyed by caller identity and counted in fixed windows. A
//! caller may send a full window's worth of requests just before a boundary
//! and another full window just after it.
//!
//! # Example
//!
//! ```rust
//! use caregate_core::admission::{Admission, AdmissionController, QuotaName, QuotaTable};
//! use http::HeaderMap;
//!
//! let controller = AdmissionController::new(QuotaTable::new());
//! match controller.enforce(&HeaderMap::new(), QuotaName::Chat) {
//!     Admission::Admitted(decision) => assert_eq!(decision.remaining, 99),
//!     Admission::Rejected(_) => unreachable!(),
//! }
//! ```

pub mod clock;
pub mod identity;
pub mod limiter;
pub mod quota;
pub mod rejection;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{ClientKey, KeyStrategy, resolve, resolve_address};
pub use limiter::{AdmissionController, DEFAULT_SWEEP_INTERVAL, RateLimitDecision, SweeperHandle};
pub use quota::{Quota, QuotaName, QuotaTable};
pub use rejection::{
    Admission, Rejection, RejectionBody, apply_rate_limit_headers, rate_limit_headers,
};
pub use store::{CounterKey, CounterStore, MemoryCounterStore, WindowCounter, fixed_window_step};
