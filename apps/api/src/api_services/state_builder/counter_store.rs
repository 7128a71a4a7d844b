use std::sync::Arc;

use hourglass_application::CounterStore;
use hourglass_core::{AppError, AppResult};
use hourglass_infrastructure::{
    FailoverCounterStore, InMemoryCounterStore, PostgresCounterStore, RedisCounterStore,
};
use sqlx::PgPool;
use tracing::info;

use crate::api_config::{ApiConfig, RateLimitStoreConfig};

pub(super) fn build_counter_store(
    pool: Option<&PgPool>,
    config: &ApiConfig,
) -> AppResult<Arc<dyn CounterStore>> {
    let store: Arc<dyn CounterStore> = match config.rate_limit_store {
        RateLimitStoreConfig::Memory => Arc::new(InMemoryCounterStore::new()),
        RateLimitStoreConfig::Redis => {
            let redis_url = config.redis_url.as_deref().ok_or_else(|| {
                AppError::Validation("REDIS_URL is required when RATE_LIMIT_STORE=redis".to_owned())
            })?;
            let client = redis::Client::open(redis_url)
                .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;

            Arc::new(FailoverCounterStore::new(
                Arc::new(RedisCounterStore::new(client, "hourglass:rate_limit")),
                "redis",
                config.rate_limit_backend_timeout,
            ))
        }
        RateLimitStoreConfig::Postgres => {
            let pool = pool.ok_or_else(|| {
                AppError::Validation(
                    "DATABASE_URL is required when RATE_LIMIT_STORE=postgres".to_owned(),
                )
            })?;

            Arc::new(FailoverCounterStore::new(
                Arc::new(PostgresCounterStore::new(pool.clone())),
                "postgres",
                config.rate_limit_backend_timeout,
            ))
        }
    };

    info!(store = ?config.rate_limit_store, "rate limit counter store ready");
    Ok(store)
}
