//! PostgreSQL-backed counter store using the `rate_limit_counters` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use hourglass_application::{CounterStore, RateLimitEntry, RateLimitRule};
use hourglass_core::{AppError, AppResult};

/// PostgreSQL implementation of the counter store port.
#[derive(Clone)]
pub struct PostgresCounterStore {
    pool: PgPool,
}

impl PostgresCounterStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for PostgresCounterStore {
    async fn get(&self, key: &str) -> AppResult<Option<RateLimitEntry>> {
        let row = sqlx::query_as::<_, CounterRow>(
            r#"
            SELECT request_count, window_reset_at
            FROM rate_limit_counters
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read rate limit counter: {error}")))?;

        row.map(CounterRow::into_entry).transpose()
    }

    async fn increment(
        &self,
        key: &str,
        rule: &RateLimitRule,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitEntry> {
        let fresh = RateLimitEntry::first_hit(now, rule.window());

        // One statement so concurrent hits on a key serialize on the row lock.
        let row = sqlx::query_as::<_, CounterRow>(
            r#"
            INSERT INTO rate_limit_counters (key, request_count, window_reset_at)
            VALUES ($1, 1, $3)
            ON CONFLICT (key) DO UPDATE
            SET
                request_count = CASE
                    WHEN rate_limit_counters.window_reset_at <= $2 THEN 1
                    ELSE LEAST(rate_limit_counters.request_count + 1, $4)
                END,
                window_reset_at = CASE
                    WHEN rate_limit_counters.window_reset_at <= $2 THEN EXCLUDED.window_reset_at
                    ELSE rate_limit_counters.window_reset_at
                END
            RETURNING request_count, window_reset_at
            "#,
        )
        .bind(key)
        .bind(now)
        .bind(fresh.window_reset_at)
        .bind(i64::from(rule.max_requests()) + 1)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to increment rate limit counter: {error}"))
        })?;

        row.into_entry()
    }

    async fn decrement(
        &self,
        key: &str,
        window_reset_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE rate_limit_counters
            SET request_count = request_count - 1
            WHERE key = $1
              AND window_reset_at = $2
              AND window_reset_at > $3
              AND request_count > 0
            "#,
        )
        .bind(key)
        .bind(window_reset_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to decrement rate limit counter: {error}"))
        })?;

        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM rate_limit_counters
            WHERE window_reset_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to cleanup expired rate limits: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CounterRow {
    request_count: i64,
    window_reset_at: DateTime<Utc>,
}

impl CounterRow {
    fn into_entry(self) -> AppResult<RateLimitEntry> {
        let count = u32::try_from(self.request_count).map_err(|error| {
            AppError::Internal(format!("invalid stored rate limit count: {error}"))
        })?;

        Ok(RateLimitEntry {
            count,
            window_reset_at: self.window_reset_at,
        })
    }
}
