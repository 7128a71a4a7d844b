//! Hourglass API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dev_seed;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::time::Duration;

use hourglass_application::RateLimitService;
use hourglass_core::AppError;
use tokio::signal;
use tracing::{debug, info, warn};

use crate::api_config::ApiConfig;
use crate::api_router::ApiRateLimitPolicies;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    api_config::init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
    let config = ApiConfig::load()?;

    let pool = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = api_services::connect_pool(database_url, config.database_pool).await?;
            api_services::run_migrations(&pool).await?;
            Some(pool)
        }
        None if migrate_only => {
            return Err(AppError::Validation(
                "DATABASE_URL is required to run migrations".to_owned(),
            ));
        }
        None => None,
    };

    if migrate_only {
        info!("migrations completed");
        return Ok(());
    }

    let app_state = api_services::build_app_state(pool, &config).await?;
    let policies = ApiRateLimitPolicies::from_config(&config)?;

    if let Some(interval) = config.rate_limit_sweep_interval {
        spawn_counter_sweeper(app_state.rate_limit_service.clone(), interval);
    }

    let app = api_router::build_router(app_state, &config.frontend_url, policies)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(
        %address,
        store = ?config.rate_limit_store,
        "hourglass-api listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))?;

    info!("hourglass-api stopped");
    Ok(())
}

fn spawn_counter_sweeper(service: RateLimitService, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match service.cleanup().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "expired rate limit counters removed"),
                Err(error) => warn!(%error, "rate limit counter sweep failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(%error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
