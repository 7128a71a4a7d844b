use std::collections::HashMap;

use async_trait::async_trait;
use hourglass_application::{IdentityProvider, PlanRepository, TeamMembershipRepository};
use hourglass_core::{AppResult, TeamId, UserIdentity};
use hourglass_domain::{PlanLevel, TeamMembership};
use tokio::sync::RwLock;

/// In-memory users, plans and team memberships for local development and
/// tests.
#[derive(Debug, Default)]
pub struct InMemoryAccessDirectory {
    tokens: RwLock<HashMap<String, UserIdentity>>,
    plans: RwLock<HashMap<String, PlanLevel>>,
    // Insertion order doubles as join order.
    memberships: RwLock<Vec<TeamMembership>>,
}

impl InMemoryAccessDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` as a bearer token for `user`.
    pub async fn register_token(&self, token: impl Into<String>, user: UserIdentity) {
        self.tokens.write().await.insert(token.into(), user);
    }

    /// Stores the profile plan for a subject.
    pub async fn set_plan(&self, subject: impl Into<String>, plan: PlanLevel) {
        self.plans.write().await.insert(subject.into(), plan);
    }

    /// Adds a membership, replacing an existing one for the same team.
    pub async fn add_membership(&self, membership: TeamMembership) {
        let mut memberships = self.memberships.write().await;
        if let Some(existing) = memberships.iter_mut().find(|existing| {
            existing.team_id() == membership.team_id() && existing.subject() == membership.subject()
        }) {
            *existing = membership;
        } else {
            memberships.push(membership);
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryAccessDirectory {
    async fn resolve_bearer_token(&self, token: &str) -> AppResult<Option<UserIdentity>> {
        Ok(self.tokens.read().await.get(token).cloned())
    }
}

#[async_trait]
impl PlanRepository for InMemoryAccessDirectory {
    async fn find_plan_for_subject(&self, subject: &str) -> AppResult<Option<PlanLevel>> {
        Ok(self.plans.read().await.get(subject).copied())
    }
}

#[async_trait]
impl TeamMembershipRepository for InMemoryAccessDirectory {
    async fn list_memberships_for_subject(
        &self,
        subject: &str,
    ) -> AppResult<Vec<TeamMembership>> {
        Ok(self
            .memberships
            .read()
            .await
            .iter()
            .filter(|membership| membership.subject() == subject)
            .cloned()
            .collect())
    }

    async fn find_membership(
        &self,
        team_id: TeamId,
        subject: &str,
    ) -> AppResult<Option<TeamMembership>> {
        Ok(self
            .memberships
            .read()
            .await
            .iter()
            .find(|membership| membership.team_id() == team_id && membership.subject() == subject)
            .cloned())
    }
}
