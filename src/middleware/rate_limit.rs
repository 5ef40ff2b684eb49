//! Rate limiting middleware
//!
//! One keyed token bucket per client: the authenticated user when the
//! session layer resolved one, otherwise the client address.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use tracing::{debug, warn};
use crate::config::RateLimitConfig;
use crate::middleware::auth::Session;
use crate::state::AppState;
use crate::utils::errors::SportsHubError;

/// Per-client limiter over `governor`'s keyed state store
pub struct ClientRateLimiter {
    enabled: bool,
    limiter: DefaultKeyedRateLimiter<String>,
    clock: DefaultClock,
}

impl std::fmt::Debug for ClientRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRateLimiter")
            .field("enabled", &self.enabled)
            .field("tracked_clients", &self.limiter.len())
            .finish()
    }
}

impl ClientRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(per_minute);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self {
            enabled: config.enabled,
            limiter: RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
        }
    }

    /// Take one cell for `key`, or report how long until one frees up
    pub fn check(&self, key: &str) -> Result<(), SportsHubError> {
        if !self.enabled {
            return Ok(());
        }

        self.limiter.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            SportsHubError::RateLimitExceeded {
                retry_after_secs: wait.as_secs().max(1),
            }
        })
    }

    /// Drop buckets that have fully refilled
    pub fn cleanup(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(tracked_clients = self.limiter.len(), "Rate limiter cleaned up");
    }
}

/// Client key: user id when authenticated, else forwarded or peer address
pub fn client_key(request: &Request) -> String {
    if let Some(session) = request.extensions().get::<Session>() {
        return format!("user:{}", session.ctx.user_id);
    }

    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return format!("ip:{}", ip);
    }

    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "ip:unknown".to_string(),
    }
}

pub async fn rate_limit_layer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(&request);
    if let Err(e) = state.rate_limiter.check(&key) {
        warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        return e.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn limiter(requests_per_minute: u32, burst: u32) -> ClientRateLimiter {
        ClientRateLimiter::new(&RateLimitConfig {
            enabled: true,
            requests_per_minute,
            burst,
        })
    }

    #[test]
    fn test_burst_then_limited() {
        let limiter = limiter(60, 3);
        for _ in 0..3 {
            assert!(limiter.check("ip:10.0.0.1").is_ok());
        }

        let err = limiter.check("ip:10.0.0.1").unwrap_err();
        assert!(matches!(err, SportsHubError::RateLimitExceeded { retry_after_secs } if retry_after_secs >= 1));
        assert_eq!(err.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(60, 1);
        assert!(limiter.check("user:1").is_ok());
        assert!(limiter.check("user:1").is_err());
        assert!(limiter.check("user:2").is_ok());
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let limiter = ClientRateLimiter::new(&RateLimitConfig {
            enabled: false,
            requests_per_minute: 1,
            burst: 1,
        });
        for _ in 0..10 {
            assert!(limiter.check("ip:10.0.0.1").is_ok());
        }
    }

    #[test]
    fn test_client_key_prefers_forwarded_address() {
        let request = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "ip:203.0.113.9");

        let mut request = axum::http::Request::new(axum::body::Body::empty());
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(client_key(&request), "ip:192.0.2.1");
    }
}
