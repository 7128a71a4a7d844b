//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access;
mod plan;
mod team;

pub use access::AccessTier;
pub use plan::PlanLevel;
pub use team::{TeamMembership, TeamRole};
