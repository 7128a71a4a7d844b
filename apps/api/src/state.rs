use std::sync::Arc;

use hourglass_application::{
    AccessGateService, IdentityProvider, RateLimitService, ScopedRateLimiter,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub rate_limit_service: RateLimitService,
    pub access_gate_service: AccessGateService,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub report_rate_limiter: ScopedRateLimiter,
}
