//! Team roles and memberships.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use hourglass_core::{AppError, AppResult, TeamId};
use serde::{Deserialize, Serialize};

use crate::access::AccessTier;

/// Per-team authorization level, independent of the subscription plan.
///
/// Variant order is the role order: `Member < Admin < Owner`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    /// Tracks time and views own reports.
    #[default]
    Member,
    /// Manages members, clients and exports.
    Admin,
    /// Owns billing and can delete the team.
    Owner,
}

impl TeamRole {
    /// Returns all roles in ascending order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::Member, Self::Admin, Self::Owner]
    }

    /// Parses a stored or transport value into a role.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            _ => Err(AppError::Validation(format!("unknown team role '{value}'"))),
        }
    }
}

impl AccessTier for TeamRole {
    const DIMENSION: &'static str = "role";

    fn lowest() -> Self {
        Self::Member
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

impl FromStr for TeamRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Display for TeamRole {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A subject's membership in one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembership {
    team_id: TeamId,
    subject: String,
    role: TeamRole,
}

impl TeamMembership {
    /// Creates a membership record.
    #[must_use]
    pub fn new(team_id: TeamId, subject: impl Into<String>, role: TeamRole) -> Self {
        Self {
            team_id,
            subject: subject.into(),
            role,
        }
    }

    /// Returns the team this membership belongs to.
    #[must_use]
    pub fn team_id(&self) -> TeamId {
        self.team_id
    }

    /// Returns the member subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the member's role in the team.
    #[must_use]
    pub fn role(&self) -> TeamRole {
        self.role
    }
}
