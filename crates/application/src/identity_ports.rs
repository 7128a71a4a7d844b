//! Identity resolution port.

use async_trait::async_trait;

use hourglass_core::{AppResult, UserIdentity};

/// Resolves bearer tokens into authenticated callers.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the caller behind the token, or `None` when the token is not
    /// accepted. Errors are reserved for provider failures.
    async fn resolve_bearer_token(&self, token: &str) -> AppResult<Option<UserIdentity>>;
}
