//! Subscription plans.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use hourglass_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::access::AccessTier;

/// Subscription plan gating feature access.
///
/// Variant order is the plan order: `Free < Pro < Enterprise`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PlanLevel {
    /// Default plan for every account.
    #[default]
    Free,
    /// Paid single-agency plan.
    Pro,
    /// Paid multi-team plan. Stored as `business` by older billing records.
    #[serde(alias = "business")]
    Enterprise,
}

impl PlanLevel {
    /// Returns all plans in ascending order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::Free, Self::Pro, Self::Enterprise]
    }

    /// Parses a stored or transport value into a plan.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "enterprise" | "business" => Ok(Self::Enterprise),
            _ => Err(AppError::Validation(format!("unknown plan '{value}'"))),
        }
    }
}

impl AccessTier for PlanLevel {
    const DIMENSION: &'static str = "plan";

    fn lowest() -> Self {
        Self::Free
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }
}

impl FromStr for PlanLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Display for PlanLevel {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
