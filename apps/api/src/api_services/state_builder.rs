use hourglass_application::{AccessGateService, RateLimitService};
use hourglass_core::AppError;
use sqlx::PgPool;

use crate::api_config::ApiConfig;
use crate::state::AppState;

mod access;
mod counter_store;

pub async fn build_app_state(
    pool: Option<PgPool>,
    config: &ApiConfig,
) -> Result<AppState, AppError> {
    let counter_store = counter_store::build_counter_store(pool.as_ref(), config)?;
    let rate_limit_service = RateLimitService::new(counter_store);

    let access = access::build_access_ports(pool.as_ref(), config).await?;
    let access_gate_service = AccessGateService::new(access.plans, access.memberships);

    let report_rate_limiter = rate_limit_service.limiter(
        config.report_rate_limit.max_requests,
        config.report_rate_limit.window_ms,
        "report_generation",
    )?;

    Ok(AppState {
        rate_limit_service,
        access_gate_service,
        identity_provider: access.identity_provider,
        report_rate_limiter,
    })
}
