//! Identity provider backed by the hosted auth service's user endpoint.

use async_trait::async_trait;
use hourglass_application::IdentityProvider;
use hourglass_core::{AppError, AppResult, UserIdentity};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

/// Resolves bearer tokens by calling `GET {auth_url}/auth/v1/user`.
pub struct HttpIdentityProvider {
    http_client: reqwest::Client,
    user_endpoint: Url,
    anon_key: String,
}

impl HttpIdentityProvider {
    /// Creates a provider for the given auth service base URL.
    pub fn new(
        http_client: reqwest::Client,
        auth_url: &Url,
        anon_key: impl Into<String>,
    ) -> AppResult<Self> {
        let user_endpoint = auth_url.join("auth/v1/user").map_err(|error| {
            AppError::Validation(format!("invalid auth service url '{auth_url}': {error}"))
        })?;

        Ok(Self {
            http_client,
            user_endpoint,
            anon_key: anon_key.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AuthUserPayload {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: AuthUserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct AuthUserMetadata {
    full_name: Option<String>,
    plan: Option<String>,
}

impl From<AuthUserPayload> for UserIdentity {
    fn from(payload: AuthUserPayload) -> Self {
        let AuthUserPayload {
            id,
            email,
            user_metadata,
        } = payload;
        let display_name = user_metadata
            .full_name
            .or_else(|| email.clone())
            .unwrap_or_else(|| id.clone());

        let identity = UserIdentity::new(id, display_name, email);
        match user_metadata.plan {
            Some(plan) => identity.with_plan_claim(plan),
            None => identity,
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve_bearer_token(&self, token: &str) -> AppResult<Option<UserIdentity>> {
        let response = self
            .http_client
            .get(self.user_endpoint.clone())
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to reach auth service: {error}"))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::Internal(format!(
                "auth service returned unexpected status {status}"
            )));
        }

        let payload = response.json::<AuthUserPayload>().await.map_err(|error| {
            AppError::Internal(format!("failed to decode auth service user: {error}"))
        })?;

        Ok(Some(payload.into()))
    }
}
