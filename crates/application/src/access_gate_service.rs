//! Plan and team-role gates evaluated before business logic.
//!
//! Both gates resolve a tier for the caller and compare it against a
//! required minimum with the same helper. Denials are ordinary values; use
//! [`AccessDecision::into_result`] to turn them into errors.

mod decision;
mod ports;
mod service;


pub use decision::{
    AccessDecision, AccessDenial, DenialKind, PlanGrant, TeamGrant, require_tier,
};
pub use ports::{PlanRepository, TeamMembershipRepository};
pub use service::AccessGateService;
