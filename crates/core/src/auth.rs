use serde::{Deserialize, Serialize};

/// Authenticated caller as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: String,
    display_name: String,
    email: Option<String>,
    plan_claim: Option<String>,
}

impl UserIdentity {
    /// Creates a user identity from authentication data.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
            email,
            plan_claim: None,
        }
    }

    /// Attaches the raw plan value carried in the provider's user metadata.
    #[must_use]
    pub fn with_plan_claim(mut self, plan_claim: impl Into<String>) -> Self {
        self.plan_claim = Some(plan_claim.into());
        self
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the unparsed plan value from session metadata, if any.
    #[must_use]
    pub fn plan_claim(&self) -> Option<&str> {
        self.plan_claim.as_deref()
    }
}
