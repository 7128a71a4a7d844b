use std::sync::Arc;

use axum::Extension;
use axum::extract::{Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use hourglass_application::{RateLimitDecision, RateLimitRule};
use hourglass_core::{AppError, UserIdentity};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Derives the counter identifier for a request.
pub type KeyGenerator = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// Rate limit configuration attached to a route group as an extension.
#[derive(Clone)]
pub struct RateLimitPolicy {
    rule: RateLimitRule,
    headers: bool,
    skip_successful_requests: bool,
    key_generator: KeyGenerator,
}

impl RateLimitPolicy {
    /// Creates a policy keyed by client address, with headers enabled.
    pub fn new(rule: RateLimitRule) -> Self {
        Self {
            rule,
            headers: true,
            skip_successful_requests: false,
            key_generator: Arc::new(client_address_key),
        }
    }

    pub fn with_headers(mut self, headers: bool) -> Self {
        self.headers = headers;
        self
    }

    /// Stops counting requests whose response status is below 400.
    pub fn skip_successful_requests(mut self, skip: bool) -> Self {
        self.skip_successful_requests = skip;
        self
    }

    pub fn with_key_generator<F>(mut self, key_generator: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.key_generator = Arc::new(key_generator);
        self
    }
}

/// First `X-Forwarded-For` entry, then `X-Real-IP`, then `unknown`.
pub fn client_address_key(request: &Request) -> String {
    client_address(request.headers()).unwrap_or_else(|| "unknown".to_owned())
}

/// Authenticated subject when identity has already been resolved, otherwise
/// the client address.
pub fn subject_or_client_key(request: &Request) -> String {
    match request.extensions().get::<UserIdentity>() {
        Some(user) => format!("user:{}", user.subject()),
        None => client_address_key(request),
    }
}

fn client_address(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    forwarded.or_else(real_ip).map(ToOwned::to_owned)
}

/// Counts the request against the route group's policy before running it.
pub async fn rate_limit(
    State(state): State<AppState>,
    Extension(policy): Extension<RateLimitPolicy>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identifier = (policy.key_generator)(&request);
    let mut decision = state
        .rate_limit_service
        .record_hit(&policy.rule, &identifier)
        .await?;

    if !decision.allowed {
        return Ok(rejection(&policy, &decision, state.rate_limit_service.now()));
    }

    let mut response = next.run(request).await;

    if policy.skip_successful_requests && response.status().as_u16() < 400 {
        match state
            .rate_limit_service
            .release_hit(&policy.rule, &identifier, &decision)
            .await
        {
            Ok(()) => decision = decision.released(),
            Err(error) => {
                warn!(scope = policy.rule.scope(), %error, "failed to release rate limit hit");
            }
        }
    }

    if policy.headers {
        insert_quota_headers(response.headers_mut(), &decision);
    }

    Ok(response)
}

fn rejection(
    policy: &RateLimitPolicy,
    decision: &RateLimitDecision,
    now: DateTime<Utc>,
) -> Response {
    let mut response = ApiError(AppError::RateLimited(
        "too many requests, please try again later".to_owned(),
    ))
    .into_response();

    let headers = response.headers_mut();
    headers.insert(
        RETRY_AFTER,
        HeaderValue::from(decision.retry_after_secs(now).max(1)),
    );
    if policy.headers {
        insert_quota_headers(headers, decision);
    }

    response
}

fn insert_quota_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(
        RATE_LIMIT_RESET,
        HeaderValue::from(decision.reset_at.timestamp()),
    );
}
