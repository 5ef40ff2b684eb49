//! Authentication middleware
//!
//! The session layer decodes an `Authorization: Bearer` access token when one
//! is present and stores the resulting [`Session`] in the request extensions.
//! Handlers then pick [`Authenticated`] or [`MaybeAuthenticated`] to state
//! whether a caller is required.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;
use crate::services::auth::{AuthContext, Claims};
use crate::state::AppState;
use crate::utils::errors::SportsHubError;

/// Caller identity resolved from a valid access token
#[derive(Debug, Clone)]
pub struct Session {
    pub claims: Claims,
    pub ctx: AuthContext,
}

/// Token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, SportsHubError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| SportsHubError::Authentication("Invalid authorization header".to_string()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(SportsHubError::Authentication("Invalid authorization header format".to_string())),
    }
}

/// Resolve the caller when a bearer token is sent; a bad token is refused
/// outright instead of silently downgrading to an anonymous request
pub async fn session_layer(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(token) => token.map(str::to_string),
        Err(e) => return e.into_response(),
    };

    if let Some(token) = token {
        match state.services.users.authenticate(&token).await {
            Ok((claims, ctx)) => {
                debug!(user_id = ctx.user_id, "Request authenticated");
                request.extensions_mut().insert(Session { claims, ctx });
            }
            Err(e) => return e.into_response(),
        }
    }

    next.run(request).await
}

/// Requires an authenticated caller
#[derive(Debug, Clone)]
pub struct Authenticated(pub Session);

impl Authenticated {
    pub fn ctx(&self) -> &AuthContext {
        &self.0.ctx
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = SportsHubError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| SportsHubError::Authentication("Authentication credentials were not provided".to_string()))
    }
}

/// Caller if one authenticated, anonymous otherwise
#[derive(Debug, Clone)]
pub struct MaybeAuthenticated(pub Option<Session>);

impl MaybeAuthenticated {
    pub fn ctx(&self) -> Option<&AuthContext> {
        self.0.as_ref().map(|session| &session.ctx)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthenticated
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthenticated(parts.extensions.get::<Session>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers).unwrap(), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(bearer_token(&headers).is_err());
    }

    #[tokio::test]
    async fn test_extractors_read_session_extension() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        assert!(Authenticated::from_request_parts(&mut parts, &()).await.is_err());
        let anonymous = MaybeAuthenticated::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(anonymous.ctx().is_none());
    }
}
