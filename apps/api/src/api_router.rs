use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use hourglass_application::RateLimitRule;
use hourglass_core::AppError;
use tower_http::trace::TraceLayer;

use crate::api_config::ApiConfig;
use crate::handlers;
use crate::middleware::{self, RateLimitPolicy};
use crate::state::AppState;

mod cors;


/// Middleware limiters applied to the `/api` route groups.
#[derive(Clone)]
pub struct ApiRateLimitPolicies {
    /// Counts every `/api` request by client address, before identity is resolved.
    pub client: RateLimitPolicy,
    /// Counts report requests by authenticated subject.
    pub member: RateLimitPolicy,
}

impl ApiRateLimitPolicies {
    pub fn from_config(config: &ApiConfig) -> Result<Self, AppError> {
        let settings = config.api_rate_limit;

        let client = RateLimitPolicy::new(RateLimitRule::new(
            "api",
            settings.max_requests,
            settings.window_ms,
        )?)
        .with_headers(config.rate_limit_headers)
        .skip_successful_requests(config.api_rate_limit_skip_successful);

        let member = RateLimitPolicy::new(RateLimitRule::new(
            "api_member",
            settings.max_requests,
            settings.window_ms,
        )?)
        .with_headers(config.rate_limit_headers)
        .skip_successful_requests(config.api_rate_limit_skip_successful)
        .with_key_generator(middleware::subject_or_client_key);

        Ok(Self { client, member })
    }
}

pub fn build_router(
    app_state: AppState,
    frontend_url: &str,
    policies: ApiRateLimitPolicies,
) -> Result<Router, AppError> {
    let report_routes = Router::new()
        .route(
            "/api/reports/generate",
            post(handlers::reports::generate_report_handler),
        )
        .route(
            "/api/reports/quota",
            get(handlers::reports::report_quota_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit,
        ))
        .layer(axum::Extension(policies.member));

    let api_routes = Router::new()
        .route(
            "/api/access/plan/{min_plan}",
            get(handlers::access::plan_access_handler),
        )
        .route(
            "/api/access/team/{min_role}",
            get(handlers::access::team_access_handler),
        )
        .merge(report_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::attach_identity,
        ))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit,
        ))
        .layer(axum::Extension(policies.client));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .with_state(app_state))
}
