use std::sync::Arc;

use tracing::{error, warn};

use hourglass_core::{AppResult, TeamId, UserIdentity};
use hourglass_domain::{AccessTier, PlanLevel, TeamMembership, TeamRole};

use super::decision::{AccessDecision, AccessDenial, PlanGrant, TeamGrant, require_tier};
use super::ports::{PlanRepository, TeamMembershipRepository};

/// Application service evaluating plan and team-role gates.
#[derive(Clone)]
pub struct AccessGateService {
    plans: Arc<dyn PlanRepository>,
    memberships: Arc<dyn TeamMembershipRepository>,
}

impl AccessGateService {
    /// Creates a new access gate service.
    #[must_use]
    pub fn new(
        plans: Arc<dyn PlanRepository>,
        memberships: Arc<dyn TeamMembershipRepository>,
    ) -> Self {
        Self { plans, memberships }
    }

    /// Resolves the caller's effective plan.
    ///
    /// The stored profile wins over the session claim; with neither, the
    /// caller is on the lowest plan.
    pub async fn resolve_plan(&self, user: &UserIdentity) -> AppResult<PlanLevel> {
        if let Some(plan) = self.plans.find_plan_for_subject(user.subject()).await? {
            return Ok(plan);
        }

        let claimed = user
            .plan_claim()
            .and_then(|claim| match PlanLevel::parse(claim) {
                Ok(plan) => Some(plan),
                Err(error) => {
                    warn!(subject = user.subject(), %error, "ignoring unrecognized plan claim");
                    None
                }
            });

        Ok(claimed.unwrap_or_else(PlanLevel::lowest))
    }

    /// Admits an authenticated caller whose plan is at least `min_plan`.
    pub async fn require_user_with_plan(
        &self,
        user: Option<&UserIdentity>,
        min_plan: PlanLevel,
    ) -> AccessDecision<PlanGrant> {
        let Some(user) = user else {
            return AccessDecision::Denied(AccessDenial::unauthenticated());
        };

        let plan = match self.resolve_plan(user).await {
            Ok(plan) => plan,
            Err(lookup_error) => {
                error!(subject = user.subject(), error = %lookup_error, "plan lookup failed");
                return AccessDecision::Denied(AccessDenial::lookup_failed(
                    "Failed to resolve subscription plan",
                ));
            }
        };

        match require_tier(plan, min_plan) {
            Ok(plan) => AccessDecision::Allowed(PlanGrant {
                user: user.clone(),
                plan,
            }),
            Err(denial) => AccessDecision::Denied(denial),
        }
    }

    /// Admits an authenticated caller whose role in the selected team is at
    /// least `min_role`.
    ///
    /// Without an explicit team the caller's earliest membership is used.
    pub async fn require_team_role(
        &self,
        user: Option<&UserIdentity>,
        requested_team: Option<TeamId>,
        min_role: TeamRole,
    ) -> AccessDecision<TeamGrant> {
        let Some(user) = user else {
            return AccessDecision::Denied(AccessDenial::unauthenticated());
        };

        let membership = match self.resolve_membership(user, requested_team).await {
            Ok(Some(membership)) => membership,
            Ok(None) => {
                return AccessDecision::Denied(AccessDenial::forbidden(
                    "Not a member of the requested team",
                ));
            }
            Err(lookup_error) => {
                error!(
                    subject = user.subject(),
                    error = %lookup_error,
                    "team membership lookup failed"
                );
                return AccessDecision::Denied(AccessDenial::lookup_failed(
                    "Failed to resolve team membership",
                ));
            }
        };

        match require_tier(membership.role(), min_role) {
            Ok(role) => AccessDecision::Allowed(TeamGrant {
                user: user.clone(),
                team_id: membership.team_id(),
                role,
            }),
            Err(denial) => AccessDecision::Denied(denial),
        }
    }

    async fn resolve_membership(
        &self,
        user: &UserIdentity,
        requested_team: Option<TeamId>,
    ) -> AppResult<Option<TeamMembership>> {
        match requested_team {
            Some(team_id) => {
                self.memberships
                    .find_membership(team_id, user.subject())
                    .await
            }
            None => Ok(self
                .memberships
                .list_memberships_for_subject(user.subject())
                .await?
                .into_iter()
                .next()),
        }
    }
}
