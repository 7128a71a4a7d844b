//! PostgreSQL reads of the externally managed `profiles` and `team_members`
//! tables.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use hourglass_application::{PlanRepository, TeamMembershipRepository};
use hourglass_core::{AppError, AppResult, TeamId};
use hourglass_domain::{PlanLevel, TeamMembership, TeamRole};

/// PostgreSQL implementation of the plan and membership repository ports.
#[derive(Clone)]
pub struct PostgresAccessRepository {
    pool: PgPool,
}

impl PostgresAccessRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    team_id: Uuid,
    user_id: String,
    role: String,
}

impl TryFrom<MembershipRow> for TeamMembership {
    type Error = AppError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        let role = TeamRole::parse(row.role.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored role for team '{}': {error}",
                row.team_id
            ))
        })?;

        Ok(TeamMembership::new(
            TeamId::from_uuid(row.team_id),
            row.user_id,
            role,
        ))
    }
}

#[async_trait]
impl PlanRepository for PostgresAccessRepository {
    async fn find_plan_for_subject(&self, subject: &str) -> AppResult<Option<PlanLevel>> {
        let plan = sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT plan
            FROM profiles
            WHERE id::text = $1
            "#,
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load profile plan: {error}")))?
        .flatten();

        plan.map(|value| {
            PlanLevel::parse(value.as_str()).map_err(|error| {
                AppError::Internal(format!("invalid stored plan for '{subject}': {error}"))
            })
        })
        .transpose()
    }
}

#[async_trait]
impl TeamMembershipRepository for PostgresAccessRepository {
    async fn list_memberships_for_subject(
        &self,
        subject: &str,
    ) -> AppResult<Vec<TeamMembership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT team_id, user_id::text AS user_id, role
            FROM team_members
            WHERE user_id::text = $1
            ORDER BY created_at ASC, team_id ASC
            "#,
        )
        .bind(subject)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list team memberships: {error}"))
        })?;

        rows.into_iter().map(TeamMembership::try_from).collect()
    }

    async fn find_membership(
        &self,
        team_id: TeamId,
        subject: &str,
    ) -> AppResult<Option<TeamMembership>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT team_id, user_id::text AS user_id, role
            FROM team_members
            WHERE team_id = $1 AND user_id::text = $2
            "#,
        )
        .bind(team_id.as_uuid())
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load team membership: {error}")))?;

        row.map(TeamMembership::try_from).transpose()
    }
}
