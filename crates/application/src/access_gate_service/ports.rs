use async_trait::async_trait;

use hourglass_core::{AppResult, TeamId};
use hourglass_domain::{PlanLevel, TeamMembership};

/// Repository port for stored subscription plans.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Returns the plan stored on the subject's profile, if any.
    async fn find_plan_for_subject(&self, subject: &str) -> AppResult<Option<PlanLevel>>;
}

/// Repository port for team memberships.
#[async_trait]
pub trait TeamMembershipRepository: Send + Sync {
    /// Lists the subject's memberships, oldest join first.
    async fn list_memberships_for_subject(&self, subject: &str)
    -> AppResult<Vec<TeamMembership>>;

    /// Finds the subject's membership in one team.
    async fn find_membership(
        &self,
        team_id: TeamId,
        subject: &str,
    ) -> AppResult<Option<TeamMembership>>;
}
