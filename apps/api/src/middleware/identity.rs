use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use hourglass_core::UserIdentity;
use tracing::debug;

use crate::error::ApiResult;
use crate::state::AppState;

/// Resolves `Authorization: Bearer <token>` and stores the caller in the
/// request extensions. Requests without an accepted token pass through
/// anonymously; the gates decide what anonymous callers may do.
pub async fn attach_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    if let Some(token) = bearer_token(request.headers()) {
        match state.identity_provider.resolve_bearer_token(token).await? {
            Some(identity) => {
                request.extensions_mut().insert(identity);
            }
            None => debug!("bearer token was not accepted"),
        }
    }

    Ok(next.run(request).await)
}

/// Caller resolved by [`attach_identity`], if any.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<UserIdentity>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<UserIdentity>().cloned()))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header};

    use super::bearer_token;

    #[test]
    fn bearer_token_requires_the_bearer_scheme() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer  tok-1 "));
        assert_eq!(bearer_token(&headers), Some("tok-1"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
