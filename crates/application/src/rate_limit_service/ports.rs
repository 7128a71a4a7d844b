use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use hourglass_core::AppResult;

use super::config::RateLimitRule;

/// Counter state for one key inside its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Hits counted in the current window, including the latest one.
    pub count: u32,
    /// When the current window ends and the count starts over.
    pub window_reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    /// Starts a fresh window at `now`.
    #[must_use]
    pub fn first_hit(now: DateTime<Utc>, window: TimeDelta) -> Self {
        Self {
            count: 1,
            window_reset_at: now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Returns whether the window is still open at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.window_reset_at
    }
}

/// Storage port for fixed-window counters.
///
/// Implementations must make every operation atomic per key: two concurrent
/// increments on one key always produce two distinct counts.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Returns the stored entry for a key, expired or not.
    async fn get(&self, key: &str) -> AppResult<Option<RateLimitEntry>>;

    /// Counts one hit for the key.
    ///
    /// Starts a new window (count 1, reset at `now + window`) when the key is
    /// absent or its window has ended. Otherwise increments the count,
    /// saturating at `max_requests + 1` so rejected requests stop counting.
    async fn increment(
        &self,
        key: &str,
        rule: &RateLimitRule,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitEntry>;

    /// Undoes one hit counted in the window ending at `window_reset_at`.
    ///
    /// Only that window is touched: if the key is absent, expired, or has
    /// since rolled over into a newer window, nothing changes.
    async fn decrement(
        &self,
        key: &str,
        window_reset_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Removes entries whose window ended before `now`.
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
