use hourglass_core::{AppError, AppResult, TeamId, UserIdentity};
use hourglass_domain::{AccessTier, PlanLevel, TeamRole};

/// Why a gate refused the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialKind {
    /// No authenticated caller.
    Unauthenticated,
    /// Caller's tier or membership does not meet the requirement.
    Forbidden,
    /// The plan or membership lookup itself failed.
    LookupFailed,
}

/// Structured denial returned by an access gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenial {
    kind: DenialKind,
    reason: String,
}

impl AccessDenial {
    /// Denial for a request without a caller.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self {
            kind: DenialKind::Unauthenticated,
            reason: "Authentication required".to_owned(),
        }
    }

    /// Denial for an authenticated caller below the requirement.
    #[must_use]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self {
            kind: DenialKind::Forbidden,
            reason: reason.into(),
        }
    }

    /// Denial caused by a failed lookup.
    #[must_use]
    pub fn lookup_failed(reason: impl Into<String>) -> Self {
        Self {
            kind: DenialKind::LookupFailed,
            reason: reason.into(),
        }
    }

    /// Returns the denial category.
    #[must_use]
    pub fn kind(&self) -> DenialKind {
        self.kind
    }

    /// Returns the human-readable reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.reason.as_str()
    }

    /// Returns the HTTP status matching the denial.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind {
            DenialKind::Unauthenticated => 401,
            DenialKind::Forbidden => 403,
            DenialKind::LookupFailed => 500,
        }
    }

    /// Converts the denial into the matching application error.
    #[must_use]
    pub fn into_error(self) -> AppError {
        match self.kind {
            DenialKind::Unauthenticated => AppError::Unauthorized(self.reason),
            DenialKind::Forbidden => AppError::Forbidden(self.reason),
            DenialKind::LookupFailed => AppError::Internal(self.reason),
        }
    }
}

/// Result of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision<G> {
    /// Caller passed; carries what the gate resolved.
    Allowed(G),
    /// Caller was refused.
    Denied(AccessDenial),
}

impl<G> AccessDecision<G> {
    /// Returns whether the caller passed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    /// Returns 200 when allowed, otherwise the denial status.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Allowed(_) => 200,
            Self::Denied(denial) => denial.status_code(),
        }
    }

    /// Converts a denial into an `AppError` so callers can use `?`.
    pub fn into_result(self) -> AppResult<G> {
        match self {
            Self::Allowed(grant) => Ok(grant),
            Self::Denied(denial) => Err(denial.into_error()),
        }
    }
}

/// Caller admitted by the plan gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanGrant {
    /// Authenticated caller.
    pub user: UserIdentity,
    /// Effective plan after profile and claim resolution.
    pub plan: PlanLevel,
}

/// Caller admitted by the team-role gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamGrant {
    /// Authenticated caller.
    pub user: UserIdentity,
    /// Team the decision applies to.
    pub team_id: TeamId,
    /// Caller's role in that team.
    pub role: TeamRole,
}

/// Compares a resolved tier against a required minimum.
pub fn require_tier<T: AccessTier>(actual: T, required: T) -> Result<T, AccessDenial> {
    if actual.satisfies(required) {
        Ok(actual)
    } else {
        Err(AccessDenial::forbidden(T::requirement_reason(required)))
    }
}
