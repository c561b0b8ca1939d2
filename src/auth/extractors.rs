use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::{jwt::TokenKeys, services::AuthError};

/// Identity resolved from a verified bearer token.
///
/// Only [`require_auth`] inserts it into the request, so a handler that takes
/// an `Identity` argument cannot run for an unauthenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
}

/// Pulls the token out of `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or("missing Authorization header")?
        .to_str()
        .map_err(|_| "non-ascii Authorization header")?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or("malformed Authorization header")?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("unsupported auth scheme");
    }
    let token = token.trim();
    if token.is_empty() {
        return Err("empty bearer token");
    }
    Ok(token)
}

/// Gate for protected routes: verify the bearer token, attach the [`Identity`], continue.
pub async fn require_auth(State(keys): State<TokenKeys>, mut req: Request, next: Next) -> Response {
    let token = match bearer_token(req.headers()) {
        Ok(t) => t,
        Err(reason) => {
            warn!(reason, "request rejected by auth gate");
            return AuthError::Unauthenticated.into_response();
        }
    };

    let user_id = match keys.verify(token) {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            return AuthError::Unauthenticated.into_response();
        }
    };

    debug!(user_id, "request authenticated");
    req.extensions_mut().insert(Identity { user_id });
    next.run(req).await
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or(AuthError::Unauthenticated)
    }
}
