//! Redis-backed counter store shared across API instances.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hourglass_application::{CounterStore, RateLimitEntry, RateLimitRule};
use hourglass_core::{AppError, AppResult};
use redis::Script;

// Each key is a hash {count, reset_at}; reset_at is epoch milliseconds taken
// from the caller's clock so window placement does not depend on Redis time.
const INCREMENT_SCRIPT: &str = r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local ceiling = tonumber(ARGV[3])

local count = tonumber(redis.call('HGET', key, 'count'))
local reset_at = tonumber(redis.call('HGET', key, 'reset_at'))

if count == nil or reset_at == nil or now_ms >= reset_at then
  count = 1
  reset_at = now_ms + window_ms
  redis.call('HSET', key, 'count', count, 'reset_at', reset_at)
  redis.call('PEXPIRE', key, window_ms)
elseif count < ceiling then
  count = redis.call('HINCRBY', key, 'count', 1)
end

return {count, reset_at}
"#;

// Only the window identified by ARGV[1] is released; a newer window that
// replaced it keeps its count.
const DECREMENT_SCRIPT: &str = r#"
local key = KEYS[1]
local counted_reset_at = tonumber(ARGV[1])
local now_ms = tonumber(ARGV[2])

local count = tonumber(redis.call('HGET', key, 'count'))
local reset_at = tonumber(redis.call('HGET', key, 'reset_at'))

if count ~= nil and reset_at == counted_reset_at and now_ms < reset_at and count > 0 then
  redis.call('HINCRBY', key, 'count', -1)
end

return 0
"#;

/// Redis implementation of the counter store port.
#[derive(Clone)]
pub struct RedisCounterStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisCounterStore {
    /// Creates a store with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

fn entry_from_parts(count: i64, reset_at_ms: i64) -> AppResult<RateLimitEntry> {
    let count = u32::try_from(count)
        .map_err(|error| AppError::Internal(format!("invalid redis counter value: {error}")))?;
    let window_reset_at = DateTime::from_timestamp_millis(reset_at_ms).ok_or_else(|| {
        AppError::Internal(format!("invalid redis window reset timestamp: {reset_at_ms}"))
    })?;

    Ok(RateLimitEntry {
        count,
        window_reset_at,
    })
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> AppResult<Option<RateLimitEntry>> {
        let mut connection = self.connection().await?;
        let (count, reset_at): (Option<i64>, Option<i64>) = redis::cmd("HMGET")
            .arg(self.key_for(key))
            .arg("count")
            .arg("reset_at")
            .query_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read redis rate limit counter: {error}"))
            })?;

        match (count, reset_at) {
            (Some(count), Some(reset_at)) => entry_from_parts(count, reset_at).map(Some),
            _ => Ok(None),
        }
    }

    async fn increment(
        &self,
        key: &str,
        rule: &RateLimitRule,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitEntry> {
        let mut connection = self.connection().await?;
        let ceiling = i64::from(rule.max_requests()) + 1;

        let (count, reset_at): (i64, i64) = Script::new(INCREMENT_SCRIPT)
            .key(self.key_for(key))
            .arg(now.timestamp_millis())
            .arg(rule.window().num_milliseconds())
            .arg(ceiling)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to increment redis rate limit counter: {error}"
                ))
            })?;

        entry_from_parts(count, reset_at)
    }

    async fn decrement(
        &self,
        key: &str,
        window_reset_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut connection = self.connection().await?;

        let _: i64 = Script::new(DECREMENT_SCRIPT)
            .key(self.key_for(key))
            .arg(window_reset_at.timestamp_millis())
            .arg(now.timestamp_millis())
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to decrement redis rate limit counter: {error}"
                ))
            })?;

        Ok(())
    }

    async fn cleanup_expired(&self, _now: DateTime<Utc>) -> AppResult<u64> {
        // Keys expire on their own via PEXPIRE.
        Ok(0)
    }
}
