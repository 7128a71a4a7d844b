use hourglass_core::AppError;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::api_config::PoolSettings;

static COUNTER_MIGRATIONS: Migrator = sqlx::migrate!("../../crates/infrastructure/migrations");

/// Opens the pool shared by the Postgres counter store and the migrator.
pub async fn connect_pool(database_url: &str, settings: PoolSettings) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    info!(
        max_connections = settings.max_connections,
        acquire_timeout = ?settings.acquire_timeout,
        "database pool ready"
    );
    Ok(pool)
}

/// Brings the `rate_limits` schema up to date.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    COUNTER_MIGRATIONS
        .run(pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    info!(
        known = COUNTER_MIGRATIONS.iter().count(),
        "counter store migrations applied"
    );
    Ok(())
}
