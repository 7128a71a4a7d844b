use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hourglass_application::{CounterStore, RateLimitEntry, RateLimitRule};
use hourglass_core::AppResult;
use tracing::warn;

use crate::InMemoryCounterStore;

/// Counter store that prefers a shared backend and falls back to a local one.
///
/// Backend errors and timeouts are logged and answered from the fallback, so
/// a limiter outage never fails a request. Quota decisions are still enforced
/// by whichever store answered.
pub struct FailoverCounterStore {
    primary: Arc<dyn CounterStore>,
    fallback: Arc<dyn CounterStore>,
    backend: &'static str,
    timeout: Duration,
}

impl FailoverCounterStore {
    /// Wraps `primary` with a fresh in-memory fallback.
    #[must_use]
    pub fn new(primary: Arc<dyn CounterStore>, backend: &'static str, timeout: Duration) -> Self {
        Self::with_fallback(primary, Arc::new(InMemoryCounterStore::new()), backend, timeout)
    }

    /// Wraps `primary` with an explicit fallback store.
    #[must_use]
    pub fn with_fallback(
        primary: Arc<dyn CounterStore>,
        fallback: Arc<dyn CounterStore>,
        backend: &'static str,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            backend,
            timeout,
        }
    }

    async fn run<T, P, F>(&self, operation: &'static str, primary: P, fallback: F) -> AppResult<T>
    where
        P: Future<Output = AppResult<T>> + Send,
        F: Future<Output = AppResult<T>> + Send,
        T: Send,
    {
        match tokio::time::timeout(self.timeout, primary).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => warn!(
                backend = self.backend,
                operation,
                %error,
                "rate limit backend failed, using in-process counters"
            ),
            Err(_) => warn!(
                backend = self.backend,
                operation,
                timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                "rate limit backend timed out, using in-process counters"
            ),
        }

        fallback.await
    }
}

#[async_trait]
impl CounterStore for FailoverCounterStore {
    async fn get(&self, key: &str) -> AppResult<Option<RateLimitEntry>> {
        self.run("get", self.primary.get(key), self.fallback.get(key))
            .await
    }

    async fn increment(
        &self,
        key: &str,
        rule: &RateLimitRule,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitEntry> {
        self.run(
            "increment",
            self.primary.increment(key, rule, now),
            self.fallback.increment(key, rule, now),
        )
        .await
    }

    async fn decrement(
        &self,
        key: &str,
        window_reset_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.run(
            "decrement",
            self.primary.decrement(key, window_reset_at, now),
            self.fallback.decrement(key, window_reset_at, now),
        )
        .await
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let local = self.fallback.cleanup_expired(now).await?;
        let shared = self
            .run("cleanup_expired", self.primary.cleanup_expired(now), async {
                Ok(0)
            })
            .await?;

        Ok(local + shared)
    }
}
