//! Redis integration service implementation
//!
//! This service holds a lazily established `ConnectionManager` and provides
//! the JWT deny-list and word-cloud snapshot cache. Every caller treats
//! Redis as best effort: failures are logged and the request continues.
//!
//! Connecting and every command are bounded by short timeouts, and a failed
//! connect is not retried until a cooldown passes, so an outage costs each
//! request at most one timeout instead of the manager's retry backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use crate::config::RedisConfig;
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::logging::log_degraded;

const REVOKED_PREFIX: &str = "revoked:";
const WORDCLOUD_KEY: &str = "wordcloud:snapshot";
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const COMMAND_TIMEOUT: Duration = Duration::from_millis(500);
const RECONNECT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Default)]
struct Link {
    manager: Option<ConnectionManager>,
    connecting: bool,
    retry_at: Option<Instant>,
}

fn unavailable(reason: &str) -> SportsHubError {
    SportsHubError::ServiceUnavailable(format!("redis {}", reason))
}

/// Run a Redis future under the command timeout
async fn bounded<T, F>(future: F) -> Result<T>
where
    F: Future<Output = RedisResult<T>>,
{
    match tokio::time::timeout(COMMAND_TIMEOUT, future).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(unavailable("command timed out")),
    }
}

/// Redis service for caching and token revocation
#[derive(Clone)]
pub struct RedisService {
    client: Client,
    link: Arc<Mutex<Link>>,
    prefix: String,
    ttl_seconds: u64,
}

impl std::fmt::Debug for RedisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisService")
            .field("prefix", &self.prefix)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl RedisService {
    /// Create a new RedisService instance; no connection is made yet
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;

        Ok(Self {
            client,
            link: Arc::new(Mutex::new(Link::default())),
            prefix: config.prefix.clone(),
            ttl_seconds: config.ttl_seconds,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Shared connection manager, connecting on first use.
    ///
    /// The lock only guards the link state; it is never held while
    /// connecting. Callers arriving during a connect or inside the cooldown
    /// fail fast.
    async fn connection(&self) -> Result<ConnectionManager> {
        {
            let mut link = self.link.lock().await;
            if let Some(manager) = link.manager.as_ref() {
                return Ok(manager.clone());
            }
            if link.connecting {
                return Err(unavailable("connect in progress"));
            }
            if link.retry_at.is_some_and(|at| Instant::now() < at) {
                return Err(unavailable("unreachable, waiting to retry"));
            }
            link.connecting = true;
        }

        let connected = tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(self.client.clone())).await;

        let mut link = self.link.lock().await;
        link.connecting = false;
        match connected {
            Ok(Ok(manager)) => {
                link.manager = Some(manager.clone());
                link.retry_at = None;
                debug!("Redis connection manager established");
                Ok(manager)
            }
            Ok(Err(e)) => {
                link.retry_at = Some(Instant::now() + RECONNECT_COOLDOWN);
                Err(e.into())
            }
            Err(_) => {
                link.retry_at = Some(Instant::now() + RECONNECT_COOLDOWN);
                Err(unavailable("connect timed out"))
            }
        }
    }

    /// Set a JSON value with TTL
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.connection().await?;
        let serialized = serde_json::to_string(value)?;
        let full_key = self.key(key);
        let ttl = ttl_seconds.unwrap_or(self.ttl_seconds);

        let _: () = bounded(conn.set_ex(&full_key, serialized, ttl)).await?;

        debug!(key = %full_key, ttl = ttl, "Value set in Redis");
        Ok(())
    }

    /// Get a JSON value
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection().await?;
        let full_key = self.key(key);

        let raw: Option<String> = bounded(conn.get(&full_key)).await?;
        match raw {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Delete a key from Redis
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let deleted: i32 = bounded(conn.del(self.key(key))).await?;
        Ok(deleted > 0)
    }

    /// Deny-list a token id until it would have expired anyway
    pub async fn revoke_token(&self, jti: &str, remaining_secs: u64) {
        if remaining_secs == 0 {
            return;
        }
        let key = format!("{}{}", REVOKED_PREFIX, jti);
        if let Err(e) = self.set_json(&key, &true, Some(remaining_secs)).await {
            log_degraded("redis", &e.to_string(), Some("revoke_token"));
        }
    }

    /// Whether a token id has been revoked; `false` when Redis is unreachable
    pub async fn is_token_revoked(&self, jti: &str) -> bool {
        let key = format!("{}{}", REVOKED_PREFIX, jti);
        match self.get_json::<bool>(&key).await {
            Ok(revoked) => revoked.unwrap_or(false),
            Err(e) => {
                log_degraded("redis", &e.to_string(), Some("is_token_revoked"));
                false
            }
        }
    }

    /// Store the latest word-cloud snapshot
    pub async fn cache_wordcloud<T: Serialize>(&self, snapshot: &T) {
        if let Err(e) = self.set_json(WORDCLOUD_KEY, snapshot, None).await {
            log_degraded("redis", &e.to_string(), Some("cache_wordcloud"));
        }
    }

    /// Last cached word-cloud snapshot, if any
    pub async fn cached_wordcloud<T: DeserializeOwned>(&self) -> Option<T> {
        match self.get_json(WORDCLOUD_KEY).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log_degraded("redis", &e.to_string(), Some("cached_wordcloud"));
                None
            }
        }
    }

    /// Health check for Redis connection
    pub async fn health_check(&self) -> bool {
        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Redis connection failed");
                return false;
            }
        };

        let result: Result<String> = bounded(redis::cmd("PING").query_async(&mut conn)).await;
        match result {
            Ok(response) => response == "PONG",
            Err(e) => {
                warn!(error = %e, "Redis health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn test_keys_are_prefixed() {
        let service = RedisService::new(&Settings::default().redis).unwrap();
        assert_eq!(service.key("wordcloud:snapshot"), "sportshub:wordcloud:snapshot");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = Settings::default().redis;
        config.url = "not a redis url".into();
        assert!(RedisService::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_redis_degrades() {
        let mut config = Settings::default().redis;
        config.url = "redis://127.0.0.1:1/".into();
        let service = RedisService::new(&config).unwrap();

        assert!(!service.is_token_revoked("missing").await);
        assert!(service.cached_wordcloud::<Vec<String>>().await.is_none());
        assert!(!service.health_check().await);
    }

    #[tokio::test]
    async fn test_outage_does_not_serialize_callers() {
        let mut config = Settings::default().redis;
        config.url = "redis://127.0.0.1:1/".into();
        let service = RedisService::new(&config).unwrap();

        let started = Instant::now();
        let checks = (0..4).map(|i| {
            let service = service.clone();
            tokio::spawn(async move { service.is_token_revoked(&format!("jti-{}", i)).await })
        });
        for check in checks.collect::<Vec<_>>() {
            assert!(!check.await.unwrap());
        }
        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());

        // inside the cooldown a lookup fails fast without reconnecting
        let started = Instant::now();
        assert!(!service.is_token_revoked("again").await);
        assert!(started.elapsed() < Duration::from_millis(200));
    }
}
