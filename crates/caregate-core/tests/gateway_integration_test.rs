//! End-to-end tests: admission, routing, SQLite logging and statistics.

use caregate_abstraction::{Priority, TaskCategory};
use caregate_core::admission::{Admission, ManualClock, Quota, QuotaName, QuotaTable};
use caregate_core::monitoring::SqliteRoutingLog;
use caregate_core::{AdmissionController, Config, Gateway, RouteRequest, RoutingStatsService, Timeframe};
use caregate_orchestrator::{BackendRouter, DecisionLogger};
use http::{HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;

fn forwarded(addr: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_static(addr));
    headers
}

#[test]
fn test_window_rollover_scenario() {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let controller = AdmissionController::new(QuotaTable::new().with(QuotaName::Chat, Quota::new(1, 60_000)))
        .with_clock(clock.clone());
    let headers = forwarded("203.0.113.9");

    assert!(controller.enforce(&headers, QuotaName::Chat).is_admitted());

    match controller.enforce(&headers, QuotaName::Chat) {
        Admission::Rejected(rejection) => {
            assert_eq!(rejection.status.as_u16(), 429);
            assert_eq!(rejection.body.retry_after, 60);
            assert_eq!(rejection.headers["x-ratelimit-remaining"], "0");
            assert_eq!(rejection.headers["x-ratelimit-reset"], "1700000060");
            assert_eq!(rejection.headers["retry-after"], "60");
        }
        Admission::Admitted(_) => panic!("second request should be rejected"),
    }

    clock.advance(Duration::from_millis(60_001));
    match controller.enforce(&headers, QuotaName::Chat) {
        Admission::Admitted(decision) => {
            assert_eq!(decision.remaining, 0);
            assert_eq!(decision.window_end_ms, 1_700_000_000_000 + 60_001 + 60_000);
        }
        Admission::Rejected(_) => panic!("window should have rolled over"),
    }
}

#[test]
fn test_denial_does_not_move_window() {
    let clock = Arc::new(ManualClock::new(0));
    let controller = AdmissionController::new(QuotaTable::new().with(QuotaName::Export, Quota::new(2, 10_000)))
        .with_clock(clock.clone());
    let client = controller.resolve_client(&forwarded("198.51.100.1"), QuotaName::Export);

    let first = controller.check_limit(QuotaName::Export, &client);
    clock.advance(Duration::from_secs(3));
    controller.check_limit(QuotaName::Export, &client);
    clock.advance(Duration::from_secs(3));
    let denied = controller.check_limit(QuotaName::Export, &client);

    assert!(!denied.allowed);
    assert_eq!(denied.window_end_ms, first.window_end_ms);
    assert_eq!(denied.retry_after_secs(), 4);
}

#[tokio::test]
async fn test_routed_requests_feed_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("routing.db");

    let log = Arc::new(SqliteRoutingLog::open(&db).unwrap());
    let gateway = Gateway::new(
        AdmissionController::new(QuotaTable::new()),
        BackendRouter::new(),
        DecisionLogger::new(log.clone()),
    );

    let requests = [
        RouteRequest::new("c1", "Thanks!", TaskCategory::Chat),
        RouteRequest::new("c1", "Short title please", TaskCategory::Title),
        RouteRequest::new("c2", "Are we compliant with the new medication rules?", TaskCategory::Compliance),
        RouteRequest::new("c3", "ok", TaskCategory::Chat).with_priority(Priority::High),
    ];
    let mut expected_cost = 0.0;
    for request in &requests {
        expected_cost += gateway.route(request).estimated_cost;
    }
    gateway.shutdown().await;

    let stats = RoutingStatsService::new(Arc::new(SqliteRoutingLog::open(&db).unwrap()))
        .aggregate(Timeframe::Day)
        .await
        .unwrap();
    assert_eq!(stats.request_count, 4);
    assert_eq!(stats.by_backend.get("claude-3-haiku"), Some(&2));
    assert_eq!(stats.by_backend.get("claude-3-opus"), Some(&2));
    assert_eq!(stats.by_category.get(&TaskCategory::Chat), Some(&2));
    assert!((stats.total_cost - expected_cost).abs() < 1e-9);
}

#[tokio::test]
async fn test_gateway_from_config_with_address_keyed_quota() {
    let config = Config::from_toml_str(
        "[admission.quotas.upload]\nmax_requests = 1\nkey_strategy = \"address\"",
    )
    .unwrap();
    let gateway = Gateway::from_config(&config, Arc::new(SqliteRoutingLog::open_in_memory().unwrap())).unwrap();

    let mut alice = forwarded("192.0.2.44");
    alice.insert("authorization", HeaderValue::from_static("Bearer alice"));
    let mut bob = forwarded("192.0.2.44");
    bob.insert("authorization", HeaderValue::from_static("Bearer bob"));

    assert!(gateway.admit(&alice, QuotaName::Upload).is_admitted());
    // Same address, different token: still the same upload bucket.
    assert!(!gateway.admit(&bob, QuotaName::Upload).is_admitted());
    gateway.shutdown().await;
}
