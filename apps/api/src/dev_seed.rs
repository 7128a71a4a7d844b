//! Seeded callers for local runs without a hosted auth service.

use hourglass_core::{TeamId, UserIdentity};
use hourglass_domain::{PlanLevel, TeamMembership, TeamRole};
use hourglass_infrastructure::InMemoryAccessDirectory;
use tracing::info;
use uuid::Uuid;

pub(crate) const DEV_SEED_TEAM_ID: Uuid =
    Uuid::from_u128(0x1111_1111_1111_1111_1111_1111_1111_1111);

struct SeedUser {
    token: &'static str,
    subject: &'static str,
    display_name: &'static str,
    email: &'static str,
    plan: PlanLevel,
    role: Option<TeamRole>,
}

const DEV_SEED_USERS: &[SeedUser] = &[
    SeedUser {
        token: "dev-owner-token",
        subject: "a2c8ea5f-4f39-4724-97f5-932f97f54f76",
        display_name: "Agency Owner",
        email: "owner@hourglass.local",
        plan: PlanLevel::Enterprise,
        role: Some(TeamRole::Owner),
    },
    SeedUser {
        token: "dev-admin-token",
        subject: "96d11e90-7403-4654-9727-cb1043f8bd31",
        display_name: "Team Admin",
        email: "admin@hourglass.local",
        plan: PlanLevel::Pro,
        role: Some(TeamRole::Admin),
    },
    SeedUser {
        token: "dev-member-token",
        subject: "3f0e7c55-0b8e-4d7a-9c1e-5a2b6d4f8e90",
        display_name: "Freelancer",
        email: "member@hourglass.local",
        plan: PlanLevel::Free,
        role: Some(TeamRole::Member),
    },
    SeedUser {
        token: "dev-solo-token",
        subject: "c7d9b1e2-6a4f-4f3b-8e2d-0f1a9b8c7d6e",
        display_name: "Solo Consultant",
        email: "solo@hourglass.local",
        plan: PlanLevel::Pro,
        role: None,
    },
];

/// Registers the seeded tokens, plans and team memberships.
pub async fn seed_directory(directory: &InMemoryAccessDirectory) {
    let team_id = TeamId::from_uuid(DEV_SEED_TEAM_ID);

    for user in DEV_SEED_USERS {
        directory
            .register_token(
                user.token,
                UserIdentity::new(user.subject, user.display_name, Some(user.email.to_owned())),
            )
            .await;
        directory.set_plan(user.subject, user.plan).await;

        if let Some(role) = user.role {
            directory
                .add_membership(TeamMembership::new(team_id, user.subject, role))
                .await;
        }
    }

    info!(
        users = DEV_SEED_USERS.len(),
        %team_id,
        "development access directory seeded"
    );
}

#[cfg(test)]
mod tests {
    use hourglass_application::{IdentityProvider, PlanRepository, TeamMembershipRepository};
    use hourglass_domain::{PlanLevel, TeamRole};
    use hourglass_infrastructure::InMemoryAccessDirectory;

    use super::seed_directory;

    #[tokio::test]
    async fn seeded_tokens_resolve_with_plans_and_roles() {
        let directory = InMemoryAccessDirectory::new();
        seed_directory(&directory).await;

        let owner = match directory.resolve_bearer_token("dev-owner-token").await {
            Ok(Some(owner)) => owner,
            other => panic!("owner token should resolve: {other:?}"),
        };
        let plan = directory.find_plan_for_subject(owner.subject()).await;
        let memberships = directory
            .list_memberships_for_subject(owner.subject())
            .await
            .unwrap_or_else(|error| panic!("listing failed: {error}"));

        assert!(matches!(plan, Ok(Some(PlanLevel::Enterprise))));
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].role(), TeamRole::Owner);
    }
}
