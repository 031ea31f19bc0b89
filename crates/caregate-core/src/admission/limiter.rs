//! Admission controller and background sweeper.

use super::clock::{Clock, SystemClock};
use super::identity::ClientKey;
use super::quota::{QuotaName, QuotaTable};
use super::rejection::{Admission, Rejection};
use super::store::{CounterKey, CounterStore, MemoryCounterStore};
use http::HeaderMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default interval between sweeps of expired counters.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Result of one admission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    /// Quota class checked.
    pub quota: QuotaName,
    /// Caller the check was counted against.
    pub client: ClientKey,
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Requests admitted per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Window end in epoch milliseconds.
    pub window_end_ms: u64,
    /// Time of the check in epoch milliseconds.
    pub checked_at_ms: u64,
}

impl RateLimitDecision {
    /// Whole seconds until the window closes, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        self.window_end_ms.saturating_sub(self.checked_at_ms).div_ceil(1000)
    }

    /// Window end as epoch seconds, rounded up.
    pub fn reset_epoch_secs(&self) -> u64 {
        self.window_end_ms.div_ceil(1000)
    }
}

/// Fixed-window admission control over named quotas.
///
/// Cloning is cheap; clones share the same counter table.
#[derive(Clone)]
pub struct AdmissionController {
    quotas: QuotaTable,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl AdmissionController {
    /// Creates a controller with an in-memory store and the system clock.
    pub fn new(quotas: QuotaTable) -> Self {
        Self { quotas, store: Arc::new(MemoryCounterStore::new()), clock: Arc::new(SystemClock) }
    }

    /// Replaces the counter store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Effective quota limits.
    pub fn quotas(&self) -> &QuotaTable {
        &self.quotas
    }

    /// The counter store.
    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    /// Counts one request for `client` against `quota`.
    pub fn check_limit(&self, quota: QuotaName, client: &ClientKey) -> RateLimitDecision {
        let limits = self.quotas.get(quota);
        let now_ms = self.clock.now_ms();
        let key = CounterKey::new(quota, client.clone());

        let (counter, allowed) =
            self.store.increment_or_reset(&key, limits.max_requests, limits.window_ms, now_ms);
        let remaining = if allowed { limits.max_requests.saturating_sub(counter.count) } else { 0 };

        let decision = RateLimitDecision {
            quota,
            client: client.clone(),
            allowed,
            limit: limits.max_requests,
            remaining,
            window_end_ms: counter.window_end_ms,
            checked_at_ms: now_ms,
        };

        if allowed {
            debug!(quota = %quota, client = %client, remaining, "Request admitted");
        } else {
            warn!(
                quota = %quota,
                client = %client,
                limit = limits.max_requests,
                retry_after_secs = decision.retry_after_secs(),
                "Rate limit exceeded"
            );
        }

        decision
    }

    /// Resolves the caller key for a quota using its key strategy.
    pub fn resolve_client(&self, headers: &HeaderMap, quota: QuotaName) -> ClientKey {
        self.quotas.get(quota).key_strategy.resolve(headers)
    }

    /// Resolves the caller and checks the quota.
    ///
    /// A denial carries the complete 429 response; an admission carries the
    /// decision the caller uses for its own rate-limit headers.
    pub fn enforce(&self, headers: &HeaderMap, quota: QuotaName) -> Admission {
        let client = self.resolve_client(headers, quota);
        let decision = self.check_limit(quota, &client);
        if decision.allowed {
            Admission::Admitted(decision)
        } else {
            Admission::Rejected(Rejection::from_decision(&decision))
        }
    }

    /// Removes every counter whose window has closed. Returns how many were removed.
    ///
    /// Each removal re-checks expiry under that key's lock, so a counter
    /// renewed since the scan is kept.
    pub fn sweep(&self) -> usize {
        let now_ms = self.clock.now_ms();
        let removed = self
            .store
            .expired_keys(now_ms)
            .iter()
            .filter(|key| self.store.remove_expired(key, now_ms))
            .count();

        if removed > 0 {
            info!(removed, remaining = self.store.len(), "Swept expired rate limit counters");
        }
        removed
    }

    /// Drops every counter.
    pub fn reset(&self) {
        self.store.clear();
    }

    /// Starts a task that sweeps on a fixed interval.
    ///
    /// The task stops when the returned handle is dropped. Must be called
    /// from within a Tokio runtime.
    pub fn spawn_sweeper(&self, interval: Duration) -> SweeperHandle {
        let controller = self.clone();
        let period = interval.max(Duration::from_millis(1));
        info!(interval_secs = period.as_secs(), "Starting rate limit sweeper");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                controller.sweep();
            }
        });

        SweeperHandle { task: Some(task) }
    }
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("quotas", &self.quotas)
            .field("counters", &self.store.len())
            .finish_non_exhaustive()
    }
}

/// Handle to a running sweeper; aborts the task on drop.
#[derive(Debug)]
pub struct SweeperHandle {
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stops the sweeper.
    pub fn stop(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Stopped rate limit sweeper");
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.abort();
    }
}
