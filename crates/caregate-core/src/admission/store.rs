//! Fixed-window counter storage.
//!
//! The window transition is a pure function so every store applies exactly
//! the same rule; stores only provide atomicity around it.

use super::identity::ClientKey;
use super::quota::QuotaName;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Counter table key: one counter per quota class and caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    /// Quota class.
    pub quota: QuotaName,
    /// Caller.
    pub client: ClientKey,
}

impl CounterKey {
    /// Creates a key.
    pub fn new(quota: QuotaName, client: ClientKey) -> Self {
        Self { quota, client }
    }
}

/// Requests counted in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCounter {
    /// Requests admitted in this window.
    pub count: u32,
    /// Window end in epoch milliseconds.
    pub window_end_ms: u64,
}

impl WindowCounter {
    /// Whether the window closed strictly before `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.window_end_ms < now_ms
    }
}

/// Applies one request to a counter.
///
/// A missing or expired counter is replaced by a fresh window holding this
/// request. A full window is returned unchanged and the request is denied.
/// Otherwise the count is incremented. Returns the new counter and whether
/// the request was admitted.
pub fn fixed_window_step(
    existing: Option<WindowCounter>,
    max_requests: u32,
    window_ms: u64,
    now_ms: u64,
) -> (WindowCounter, bool) {
    match existing {
        Some(counter) if !counter.is_expired(now_ms) => {
            if counter.count >= max_requests {
                (counter, false)
            } else {
                (WindowCounter { count: counter.count + 1, ..counter }, true)
            }
        }
        _ => (WindowCounter { count: 1, window_end_ms: now_ms.saturating_add(window_ms) }, true),
    }
}

/// Storage for quota counters.
///
/// `increment_or_reset` must be atomic per key: two concurrent calls for the
/// same key observe each other's effect. Removal must only take whatever
/// lock protects a single key.
pub trait CounterStore: Send + Sync {
    /// Current counter for a key.
    fn get(&self, key: &CounterKey) -> Option<WindowCounter>;

    /// Applies [`fixed_window_step`] atomically and stores the result.
    fn increment_or_reset(
        &self,
        key: &CounterKey,
        max_requests: u32,
        window_ms: u64,
        now_ms: u64,
    ) -> (WindowCounter, bool);

    /// Removes a counter if its window has closed. Returns whether it was removed.
    fn remove_expired(&self, key: &CounterKey, now_ms: u64) -> bool;

    /// Keys whose windows have closed.
    fn expired_keys(&self, now_ms: u64) -> Vec<CounterKey>;

    /// Number of stored counters.
    fn len(&self) -> usize;

    /// Whether no counters are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every counter.
    fn clear(&self);
}

/// In-process counter table sharded by key.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<CounterKey, WindowCounter>,
}

impl MemoryCounterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    fn get(&self, key: &CounterKey) -> Option<WindowCounter> {
        self.counters.get(key).map(|c| *c)
    }

    fn increment_or_reset(
        &self,
        key: &CounterKey,
        max_requests: u32,
        window_ms: u64,
        now_ms: u64,
    ) -> (WindowCounter, bool) {
        // The entry guard holds the shard lock for the whole step.
        match self.counters.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let (next, allowed) = fixed_window_step(Some(*occupied.get()), max_requests, window_ms, now_ms);
                if allowed {
                    *occupied.get_mut() = next;
                }
                (next, allowed)
            }
            Entry::Vacant(vacant) => {
                let (next, allowed) = fixed_window_step(None, max_requests, window_ms, now_ms);
                vacant.insert(next);
                (next, allowed)
            }
        }
    }

    fn remove_expired(&self, key: &CounterKey, now_ms: u64) -> bool {
        self.counters.remove_if(key, |_, counter| counter.is_expired(now_ms)).is_some()
    }

    fn expired_keys(&self, now_ms: u64) -> Vec<CounterKey> {
        self.counters
            .iter()
            .filter(|entry| entry.value().is_expired(now_ms))
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.counters.len()
    }

    fn clear(&self) {
        self.counters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(client: &str) -> CounterKey {
        CounterKey::new(QuotaName::Chat, ClientKey::new(client))
    }

    #[test]
    fn test_step_creates_window() {
        let (counter, allowed) = fixed_window_step(None, 3, 1_000, 5_000);
        assert!(allowed);
        assert_eq!(counter, WindowCounter { count: 1, window_end_ms: 6_000 });
    }

    #[test]
    fn test_step_denies_full_window_without_change() {
        let full = WindowCounter { count: 3, window_end_ms: 6_000 };
        assert_eq!(fixed_window_step(Some(full), 3, 1_000, 5_500), (full, false));
    }

    #[test]
    fn test_step_window_end_is_inclusive() {
        let full = WindowCounter { count: 3, window_end_ms: 6_000 };
        assert!(!fixed_window_step(Some(full), 3, 1_000, 6_000).1);
        let (fresh, allowed) = fixed_window_step(Some(full), 3, 1_000, 6_001);
        assert!(allowed);
        assert_eq!(fresh, WindowCounter { count: 1, window_end_ms: 7_001 });
    }

    #[test]
    fn test_store_counts_and_denies() {
        let store = MemoryCounterStore::new();
        let k = key("ip:1.2.3.4");
        assert!(store.increment_or_reset(&k, 2, 1_000, 0).1);
        assert!(store.increment_or_reset(&k, 2, 1_000, 10).1);
        let (counter, allowed) = store.increment_or_reset(&k, 2, 1_000, 20);
        assert!(!allowed);
        assert_eq!(counter, WindowCounter { count: 2, window_end_ms: 1_000 });
        assert_eq!(store.get(&k), Some(counter));
    }

    #[test]
    fn test_remove_expired_keeps_live_counters() {
        let store = MemoryCounterStore::new();
        store.increment_or_reset(&key("a"), 5, 1_000, 0);
        store.increment_or_reset(&key("b"), 5, 1_000, 500);

        assert_eq!(store.expired_keys(1_200), vec![key("a")]);
        assert!(!store.remove_expired(&key("b"), 1_200));
        assert!(store.remove_expired(&key("a"), 1_200));
        assert_eq!(store.len(), 1);
        assert!(store.get(&key("b")).is_some());
    }

    #[test]
    fn test_expired_keys_on_empty_store() {
        let store = MemoryCounterStore::new();
        assert!(store.expired_keys(u64::MAX).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_increments_never_exceed_limit() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        let store = Arc::new(MemoryCounterStore::new());
        let admitted = Arc::new(AtomicU32::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if store.increment_or_reset(&key("shared"), 50, 60_000, 1).1 {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(admitted.load(Ordering::SeqCst), 50);
        assert_eq!(store.get(&key("shared")).unwrap().count, 50);
    }
}
