use hourglass_core::AppResult;

use super::config::RateLimitRule;
use super::service::{RateLimitDecision, RateLimitService};

/// A rate limiter bound to one rule, checked inline by handlers.
#[derive(Clone)]
pub struct ScopedRateLimiter {
    service: RateLimitService,
    rule: RateLimitRule,
}

impl ScopedRateLimiter {
    pub(crate) fn new(service: RateLimitService, rule: RateLimitRule) -> Self {
        Self { service, rule }
    }

    /// Returns the bound rule.
    #[must_use]
    pub fn rule(&self) -> &RateLimitRule {
        &self.rule
    }

    /// Counts one request for the identifier, failing when over quota.
    pub async fn check(&self, identifier: &str) -> AppResult<()> {
        self.service.check_rate_limit(&self.rule, identifier).await
    }

    /// Reports the identifier's quota without counting.
    pub async fn peek(&self, identifier: &str) -> AppResult<Option<RateLimitDecision>> {
        self.service.peek(&self.rule, identifier).await
    }
}
