//! Application services and ports.

#![forbid(unsafe_code)]

mod access_gate_service;
mod clock;
mod identity_ports;
mod rate_limit_service;

pub use access_gate_service::{
    AccessDecision, AccessDenial, AccessGateService, DenialKind, PlanGrant, PlanRepository,
    TeamGrant, TeamMembershipRepository, require_tier,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use identity_ports::IdentityProvider;
pub use rate_limit_service::{
    CounterStore, RateLimitDecision, RateLimitEntry, RateLimitRule, RateLimitService,
    ScopedRateLimiter,
};
