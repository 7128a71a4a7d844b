use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use hourglass_core::{AppError, AppResult};

use crate::clock::{Clock, SystemClock};

use super::config::RateLimitRule;
use super::ports::{CounterStore, RateLimitEntry};
use super::scoped::ScopedRateLimiter;

/// Outcome of counting one request against a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request fits in the quota.
    pub allowed: bool,
    /// Quota size for the window.
    pub limit: u32,
    /// Requests left in the window after this one.
    pub remaining: u32,
    /// When the window ends.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Builds the decision for a hit that has just been counted.
    #[must_use]
    pub fn from_counted_entry(rule: &RateLimitRule, entry: RateLimitEntry) -> Self {
        Self {
            allowed: entry.count <= rule.max_requests(),
            limit: rule.max_requests(),
            remaining: rule.max_requests().saturating_sub(entry.count),
            reset_at: entry.window_reset_at,
        }
    }

    /// Builds the decision a new request would get, without counting it.
    #[must_use]
    pub fn projected(rule: &RateLimitRule, entry: RateLimitEntry) -> Self {
        Self {
            allowed: entry.count < rule.max_requests(),
            limit: rule.max_requests(),
            remaining: rule.max_requests().saturating_sub(entry.count),
            reset_at: entry.window_reset_at,
        }
    }

    /// Returns the decision as it stands once this hit has been released.
    #[must_use]
    pub fn released(self) -> Self {
        Self {
            remaining: self.remaining.saturating_add(1).min(self.limit),
            ..self
        }
    }

    /// Returns how long a denied caller should wait, never negative.
    #[must_use]
    pub fn retry_after(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.reset_at - now).max(TimeDelta::zero())
    }

    /// Returns `retry_after` rounded up to whole seconds.
    #[must_use]
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> i64 {
        let millis = self.retry_after(now).num_milliseconds();
        (millis + 999) / 1000
    }
}

/// Application service for fixed-window rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimitService {
    /// Creates a service reading the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a service reading the given clock.
    #[must_use]
    pub fn with_clock(store: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns the current instant as seen by this service.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Counts one request for the identifier and reports whether it fits.
    pub async fn record_hit(
        &self,
        rule: &RateLimitRule,
        identifier: &str,
    ) -> AppResult<RateLimitDecision> {
        let key = rule.key_for(identifier);
        let entry = self.store.increment(&key, rule, self.clock.now()).await?;
        let decision = RateLimitDecision::from_counted_entry(rule, entry);

        if !decision.allowed {
            debug!(
                scope = rule.scope(),
                identifier,
                count = entry.count,
                limit = rule.max_requests(),
                "rate limit exceeded"
            );
        }

        Ok(decision)
    }

    /// Gives back a previously counted request.
    ///
    /// The release applies only to the window `counted` was recorded in; a
    /// window opened since then keeps its count.
    pub async fn release_hit(
        &self,
        rule: &RateLimitRule,
        identifier: &str,
        counted: &RateLimitDecision,
    ) -> AppResult<()> {
        self.store
            .decrement(&rule.key_for(identifier), counted.reset_at, self.clock.now())
            .await
    }

    /// Counts one request and fails with `AppError::RateLimited` over quota.
    pub async fn check_rate_limit(&self, rule: &RateLimitRule, identifier: &str) -> AppResult<()> {
        let decision = self.record_hit(rule, identifier).await?;
        if decision.allowed {
            return Ok(());
        }

        Err(AppError::RateLimited(format!(
            "too many {} requests, try again in {} seconds",
            rule.scope(),
            decision.retry_after_secs(self.clock.now())
        )))
    }

    /// Reports the quota state without counting a request.
    ///
    /// Returns `None` when the identifier has no open window.
    pub async fn peek(
        &self,
        rule: &RateLimitRule,
        identifier: &str,
    ) -> AppResult<Option<RateLimitDecision>> {
        let now = self.clock.now();
        let entry = self.store.get(&rule.key_for(identifier)).await?;

        Ok(entry
            .filter(|entry| entry.is_active_at(now))
            .map(|entry| RateLimitDecision::projected(rule, entry)))
    }

    /// Binds a rule to this service.
    #[must_use]
    pub fn scoped(&self, rule: RateLimitRule) -> ScopedRateLimiter {
        ScopedRateLimiter::new(self.clone(), rule)
    }

    /// Builds a limiter for handler code that checks one caller at a time.
    pub fn limiter(
        &self,
        max_requests: u32,
        window_ms: u64,
        scope: impl Into<String>,
    ) -> AppResult<ScopedRateLimiter> {
        Ok(self.scoped(RateLimitRule::new(scope, max_requests, window_ms)?))
    }

    /// Removes counters whose window has ended.
    pub async fn cleanup(&self) -> AppResult<u64> {
        self.store.cleanup_expired(self.clock.now()).await
    }
}
