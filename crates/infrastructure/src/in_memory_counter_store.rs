use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hourglass_application::{CounterStore, RateLimitEntry, RateLimitRule};
use hourglass_core::AppResult;
use tokio::sync::RwLock;

/// Process-local counter store.
///
/// Every mutation holds the write lock for the whole read-modify-write, so
/// concurrent hits on one key are never lost or double counted.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    entries: RwLock<HashMap<String, RateLimitEntry>>,
}

impl InMemoryCounterStore {
    /// Creates an empty in-memory counter store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get(&self, key: &str) -> AppResult<Option<RateLimitEntry>> {
        Ok(self.entries.read().await.get(key).copied())
    }

    async fn increment(
        &self,
        key: &str,
        rule: &RateLimitRule,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitEntry> {
        let ceiling = rule.max_requests().saturating_add(1);
        let mut entries = self.entries.write().await;

        let entry = match entries.get_mut(key) {
            Some(entry) if entry.is_active_at(now) => {
                entry.count = entry.count.saturating_add(1).min(ceiling);
                *entry
            }
            Some(entry) => {
                *entry = RateLimitEntry::first_hit(now, rule.window());
                *entry
            }
            None => {
                let entry = RateLimitEntry::first_hit(now, rule.window());
                entries.insert(key.to_owned(), entry);
                entry
            }
        };

        Ok(entry)
    }

    async fn decrement(
        &self,
        key: &str,
        window_reset_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key)
            && entry.window_reset_at == window_reset_at
            && entry.is_active_at(now)
        {
            entry.count = entry.count.saturating_sub(1);
        }

        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_active_at(now));

        Ok(u64::try_from(before - entries.len()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, Utc};
    use hourglass_application::{CounterStore, RateLimitRule};

    use super::InMemoryCounterStore;

    fn rule(max_requests: u32, window_ms: u64) -> RateLimitRule {
        RateLimitRule::new("test", max_requests, window_ms)
            .unwrap_or_else(|error| panic!("rule should be valid: {error}"))
    }

    #[tokio::test]
    async fn first_hit_opens_window_and_later_hits_keep_reset_time() {
        let store = InMemoryCounterStore::new();
        let rule = rule(5, 1000);
        let now = Utc::now();

        let first = store
            .increment("test:a", &rule, now)
            .await
            .unwrap_or_else(|error| panic!("increment failed: {error}"));
        let second = store
            .increment("test:a", &rule, now + TimeDelta::milliseconds(400))
            .await
            .unwrap_or_else(|error| panic!("increment failed: {error}"));

        assert_eq!(first.count, 1);
        assert_eq!(first.window_reset_at, now + TimeDelta::milliseconds(1000));
        assert_eq!(second.count, 2);
        assert_eq!(second.window_reset_at, first.window_reset_at);
    }

    #[tokio::test]
    async fn expired_window_restarts_at_one() {
        let store = InMemoryCounterStore::new();
        let rule = rule(5, 1000);
        let now = Utc::now();

        for _ in 0..3 {
            let _ = store.increment("test:a", &rule, now).await;
        }
        let restarted = store
            .increment("test:a", &rule, now + TimeDelta::milliseconds(1000))
            .await
            .unwrap_or_else(|error| panic!("increment failed: {error}"));

        assert_eq!(restarted.count, 1);
        assert_eq!(
            restarted.window_reset_at,
            now + TimeDelta::milliseconds(2000)
        );
    }

    #[tokio::test]
    async fn count_saturates_one_past_the_limit() {
        let store = InMemoryCounterStore::new();
        let rule = rule(2, 60_000);
        let now = Utc::now();

        for _ in 0..20 {
            let _ = store.increment("test:a", &rule, now).await;
        }
        let entry = store
            .get("test:a")
            .await
            .unwrap_or_else(|error| panic!("get failed: {error}"));

        assert_eq!(entry.map(|entry| entry.count), Some(3));
    }

    #[tokio::test]
    async fn concurrent_increments_are_all_counted() {
        let store = Arc::new(InMemoryCounterStore::new());
        let rule = Arc::new(rule(1000, 60_000));
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            let rule = rule.clone();
            handles.push(tokio::spawn(async move {
                store.increment("test:shared", &rule, now).await
            }));
        }

        let mut counts = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Ok(entry)) => counts.push(entry.count),
                Ok(Err(error)) => panic!("increment failed: {error}"),
                Err(error) => panic!("task panicked: {error}"),
            }
        }
        counts.sort_unstable();

        assert_eq!(counts, (1..=50).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn decrement_ignores_closed_windows_and_never_underflows() {
        let store = InMemoryCounterStore::new();
        let rule = rule(5, 1000);
        let now = Utc::now();

        let counted = store
            .increment("test:a", &rule, now)
            .await
            .unwrap_or_else(|error| panic!("increment failed: {error}"));
        let reset_at = counted.window_reset_at;
        assert!(store.decrement("test:a", reset_at, now).await.is_ok());
        assert!(store.decrement("test:a", reset_at, now).await.is_ok());
        assert!(store.decrement("test:missing", reset_at, now).await.is_ok());

        let entry = store
            .get("test:a")
            .await
            .unwrap_or_else(|error| panic!("get failed: {error}"));
        assert_eq!(entry.map(|entry| entry.count), Some(0));

        let counted = store
            .increment("test:b", &rule, now)
            .await
            .unwrap_or_else(|error| panic!("increment failed: {error}"));
        assert!(
            store
                .decrement("test:b", counted.window_reset_at, now + TimeDelta::seconds(2))
                .await
                .is_ok()
        );
        let expired = store
            .get("test:b")
            .await
            .unwrap_or_else(|error| panic!("get failed: {error}"));
        assert_eq!(expired.map(|entry| entry.count), Some(1));
    }

    #[tokio::test]
    async fn decrement_leaves_a_newer_window_alone() {
        let store = InMemoryCounterStore::new();
        let rule = rule(5, 1000);
        let now = Utc::now();

        let stale = store
            .increment("test:rollover", &rule, now + TimeDelta::milliseconds(999))
            .await
            .unwrap_or_else(|error| panic!("increment failed: {error}"));
        let later = now + TimeDelta::milliseconds(2000);
        let fresh = store
            .increment("test:rollover", &rule, later)
            .await
            .unwrap_or_else(|error| panic!("increment failed: {error}"));
        assert_eq!(fresh.count, 1);

        assert!(
            store
                .decrement("test:rollover", stale.window_reset_at, later)
                .await
                .is_ok()
        );

        let entry = store
            .get("test:rollover")
            .await
            .unwrap_or_else(|error| panic!("get failed: {error}"));
        assert_eq!(entry.map(|entry| entry.count), Some(1));
    }

    #[tokio::test]
    async fn cleanup_drops_expired_entries() {
        let store = InMemoryCounterStore::new();
        let short = rule(5, 1000);
        let long = rule(5, 60_000);
        let now = Utc::now();

        let _ = store.increment("short:a", &short, now).await;
        let _ = store.increment("long:a", &long, now).await;

        let removed = store
            .cleanup_expired(now + TimeDelta::seconds(5))
            .await
            .unwrap_or_else(|error| panic!("cleanup failed: {error}"));

        assert_eq!(removed, 1);
        assert!(matches!(store.get("short:a").await, Ok(None)));
        assert!(matches!(store.get("long:a").await, Ok(Some(_))));
    }
}
