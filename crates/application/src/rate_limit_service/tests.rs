use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use hourglass_core::{AppError, AppResult};
use tokio::sync::Mutex;

use crate::clock::{Clock, ManualClock};

use super::{CounterStore, RateLimitDecision, RateLimitEntry, RateLimitRule, RateLimitService};

#[derive(Default)]
struct FakeCounterStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

#[async_trait]
impl CounterStore for FakeCounterStore {
    async fn get(&self, key: &str) -> AppResult<Option<RateLimitEntry>> {
        Ok(self.entries.lock().await.get(key).copied())
    }

    async fn increment(
        &self,
        key: &str,
        rule: &RateLimitRule,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitEntry> {
        let mut entries = self.entries.lock().await;
        let entry = match entries.get(key) {
            Some(entry) if entry.is_active_at(now) => RateLimitEntry {
                count: entry
                    .count
                    .saturating_add(1)
                    .min(rule.max_requests().saturating_add(1)),
                window_reset_at: entry.window_reset_at,
            },
            _ => RateLimitEntry::first_hit(now, rule.window()),
        };
        entries.insert(key.to_owned(), entry);
        Ok(entry)
    }

    async fn decrement(
        &self,
        key: &str,
        window_reset_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(entry) = self.entries.lock().await.get_mut(key)
            && entry.window_reset_at == window_reset_at
            && entry.is_active_at(now)
        {
            entry.count = entry.count.saturating_sub(1);
        }
        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_active_at(now));
        Ok((before - entries.len()) as u64)
    }
}

struct FailingCounterStore;

#[async_trait]
impl CounterStore for FailingCounterStore {
    async fn get(&self, _key: &str) -> AppResult<Option<RateLimitEntry>> {
        Err(AppError::Internal("store offline".to_owned()))
    }

    async fn increment(
        &self,
        _key: &str,
        _rule: &RateLimitRule,
        _now: DateTime<Utc>,
    ) -> AppResult<RateLimitEntry> {
        Err(AppError::Internal("store offline".to_owned()))
    }

    async fn decrement(
        &self,
        _key: &str,
        _window_reset_at: DateTime<Utc>,
        _now: DateTime<Utc>,
    ) -> AppResult<()> {
        Err(AppError::Internal("store offline".to_owned()))
    }

    async fn cleanup_expired(&self, _now: DateTime<Utc>) -> AppResult<u64> {
        Err(AppError::Internal("store offline".to_owned()))
    }
}

fn service_with_clock() -> (RateLimitService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let service = RateLimitService::with_clock(Arc::new(FakeCounterStore::default()), clock.clone());
    (service, clock)
}

fn rule(scope: &str, max_requests: u32, window_ms: u64) -> RateLimitRule {
    RateLimitRule::new(scope, max_requests, window_ms)
        .unwrap_or_else(|error| panic!("rule should be valid: {error}"))
}

#[tokio::test]
async fn allows_requests_up_to_the_quota_then_denies() {
    let (service, _clock) = service_with_clock();
    let rule = rule("api", 3, 60_000);

    for expected_remaining in [2, 1, 0] {
        let decision = service
            .record_hit(&rule, "10.0.0.1")
            .await
            .unwrap_or_else(|error| panic!("hit should be counted: {error}"));
        assert!(decision.allowed);
        assert_eq!(decision.remaining, expected_remaining);
        assert_eq!(decision.limit, 3);
    }

    let denied = service
        .record_hit(&rule, "10.0.0.1")
        .await
        .unwrap_or_else(|error| panic!("hit should be counted: {error}"));
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);
}

#[tokio::test]
async fn window_starts_over_once_reset_time_passes() {
    let (service, clock) = service_with_clock();
    let rule = rule("test", 2, 1000);

    assert!(service.check_rate_limit(&rule, "user-1").await.is_ok());
    assert!(service.check_rate_limit(&rule, "user-1").await.is_ok());
    let result = service.check_rate_limit(&rule, "user-1").await;
    assert!(matches!(result, Err(AppError::RateLimited(_))));

    clock.advance(TimeDelta::milliseconds(999));
    assert!(service.check_rate_limit(&rule, "user-1").await.is_err());

    clock.advance(TimeDelta::milliseconds(1));
    assert!(service.check_rate_limit(&rule, "user-1").await.is_ok());

    let state = service
        .peek(&rule, "user-1")
        .await
        .unwrap_or_else(|error| panic!("peek should succeed: {error}"));
    assert_eq!(state.map(|decision| decision.remaining), Some(1));
}

#[tokio::test]
async fn reset_time_is_fixed_by_the_first_hit() {
    let (service, clock) = service_with_clock();
    let rule = rule("api", 5, 10_000);
    let start = clock.now();

    let first = service
        .record_hit(&rule, "k")
        .await
        .unwrap_or_else(|error| panic!("hit should be counted: {error}"));
    clock.advance(TimeDelta::seconds(4));
    let second = service
        .record_hit(&rule, "k")
        .await
        .unwrap_or_else(|error| panic!("hit should be counted: {error}"));

    assert_eq!(first.reset_at, start + TimeDelta::seconds(10));
    assert_eq!(second.reset_at, first.reset_at);
}

#[tokio::test]
async fn identifiers_and_scopes_do_not_share_counters() {
    let (service, _clock) = service_with_clock();
    let reports = rule("report_generation", 1, 60_000);
    let exports = rule("export", 1, 60_000);

    assert!(service.check_rate_limit(&reports, "alice").await.is_ok());
    assert!(service.check_rate_limit(&reports, "bob").await.is_ok());
    assert!(service.check_rate_limit(&exports, "alice").await.is_ok());
    assert!(service.check_rate_limit(&reports, "alice").await.is_err());
}

#[tokio::test]
async fn zero_quota_denies_the_first_request() {
    let (service, _clock) = service_with_clock();
    let rule = rule("locked", 0, 60_000);

    let decision = service
        .record_hit(&rule, "anyone")
        .await
        .unwrap_or_else(|error| panic!("hit should be counted: {error}"));
    assert!(!decision.allowed);
    assert_eq!(decision.remaining, 0);
}

#[tokio::test]
async fn denied_hits_stop_counting_past_the_limit() {
    let store = Arc::new(FakeCounterStore::default());
    let service = RateLimitService::with_clock(store.clone(), Arc::new(ManualClock::default()));
    let rule = rule("api", 2, 60_000);

    for _ in 0..10 {
        let _ = service.record_hit(&rule, "flood").await;
    }

    let entry = store
        .get("api:flood")
        .await
        .unwrap_or_else(|error| panic!("get should succeed: {error}"));
    assert_eq!(entry.map(|entry| entry.count), Some(3));
}

#[tokio::test]
async fn released_hit_frees_one_slot() {
    let (service, _clock) = service_with_clock();
    let rule = rule("api", 1, 60_000);

    let counted = service
        .record_hit(&rule, "ip")
        .await
        .unwrap_or_else(|error| panic!("hit should be counted: {error}"));
    assert!(counted.allowed);
    service
        .release_hit(&rule, "ip", &counted)
        .await
        .unwrap_or_else(|error| panic!("release should succeed: {error}"));
    assert!(service.check_rate_limit(&rule, "ip").await.is_ok());
}

#[test]
fn released_decision_gives_back_one_slot_up_to_the_limit() {
    let reset_at = Utc::now();
    let spent = RateLimitDecision {
        allowed: true,
        limit: 3,
        remaining: 0,
        reset_at,
    };
    assert_eq!(spent.released().remaining, 1);

    let full = RateLimitDecision {
        remaining: 3,
        ..spent
    };
    assert_eq!(full.released().remaining, 3);
}

#[tokio::test]
async fn release_after_rollover_keeps_the_newer_window_count() {
    let store = Arc::new(FakeCounterStore::default());
    let clock = Arc::new(ManualClock::default());
    let service = RateLimitService::with_clock(store.clone(), clock.clone());
    let rule = rule("api", 5, 1_000);

    clock.advance(TimeDelta::milliseconds(999));
    let slow = service
        .record_hit(&rule, "ip")
        .await
        .unwrap_or_else(|error| panic!("hit should be counted: {error}"));

    clock.advance(TimeDelta::milliseconds(1_001));
    let fresh = service
        .record_hit(&rule, "ip")
        .await
        .unwrap_or_else(|error| panic!("hit should be counted: {error}"));
    assert_eq!(fresh.remaining, 4);

    service
        .release_hit(&rule, "ip", &slow)
        .await
        .unwrap_or_else(|error| panic!("release should succeed: {error}"));

    let entry = store
        .get("api:ip")
        .await
        .unwrap_or_else(|error| panic!("get should succeed: {error}"));
    assert_eq!(entry.map(|entry| entry.count), Some(1));
}

#[tokio::test]
async fn rate_limited_error_mentions_retry_seconds() {
    let (service, clock) = service_with_clock();
    let limiter = service
        .limiter(1, 30_000, "report_generation")
        .unwrap_or_else(|error| panic!("limiter should build: {error}"));

    assert!(limiter.check("user-1").await.is_ok());
    clock.advance(TimeDelta::milliseconds(10_500));

    match limiter.check("user-1").await {
        Err(AppError::RateLimited(message)) => {
            assert!(message.contains("report_generation"));
            assert!(message.contains("20 seconds"));
        }
        other => panic!("expected rate limited error, got {other:?}"),
    }
}

#[tokio::test]
async fn peek_does_not_count_and_ignores_closed_windows() {
    let (service, clock) = service_with_clock();
    let rule = rule("api", 2, 1000);

    let untouched = service
        .peek(&rule, "ip")
        .await
        .unwrap_or_else(|error| panic!("peek should succeed: {error}"));
    assert_eq!(untouched, None);

    assert!(service.check_rate_limit(&rule, "ip").await.is_ok());
    assert!(service.check_rate_limit(&rule, "ip").await.is_ok());
    let exhausted = service
        .peek(&rule, "ip")
        .await
        .unwrap_or_else(|error| panic!("peek should succeed: {error}"));
    assert_eq!(exhausted.map(|decision| decision.allowed), Some(false));

    clock.advance(TimeDelta::seconds(1));
    let expired = service
        .peek(&rule, "ip")
        .await
        .unwrap_or_else(|error| panic!("peek should succeed: {error}"));
    assert_eq!(expired, None);
}

#[tokio::test]
async fn cleanup_removes_only_closed_windows() {
    let (service, clock) = service_with_clock();
    let short = rule("short", 5, 1000);
    let long = rule("long", 5, 60_000);

    assert!(service.check_rate_limit(&short, "a").await.is_ok());
    assert!(service.check_rate_limit(&long, "a").await.is_ok());
    clock.advance(TimeDelta::seconds(2));

    let removed = service
        .cleanup()
        .await
        .unwrap_or_else(|error| panic!("cleanup should succeed: {error}"));
    assert_eq!(removed, 1);
}

#[tokio::test]
async fn store_errors_surface_to_the_caller() {
    let service = RateLimitService::new(Arc::new(FailingCounterStore));
    let rule = rule("api", 5, 1000);

    let result = service.check_rate_limit(&rule, "ip").await;
    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[test]
fn rule_rejects_blank_scope_and_empty_window() {
    assert!(matches!(
        RateLimitRule::new("  ", 5, 1000),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        RateLimitRule::new("api", 5, 0),
        Err(AppError::Validation(_))
    ));
    assert_eq!(rule("api", 5, 1000).key_for("1.2.3.4"), "api:1.2.3.4");
}
