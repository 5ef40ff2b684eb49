//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from built-in defaults, an optional `config` file
//! and `SPORTSHUB__*` environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub bootstrap: BootstrapConfig,
    pub uploads: UploadsConfig,
    pub rate_limit: RateLimitConfig,
    pub wordcloud: WordCloudConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Token issuing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
}

/// First-boot superuser provisioning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: Option<String>,
}

/// Uploaded image storage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadsConfig {
    pub dir: String,
    pub max_image_bytes: usize,
    /// URL prefix under which `dir` is served
    pub public_prefix: String,
}

/// Per-client request limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_minute: u32,
    pub burst: u32,
}

/// Comment word cloud tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WordCloudConfig {
    pub window_days: i64,
    pub max_comments: i64,
    pub max_words: usize,
    /// Quiet period used to coalesce bursts of comment changes
    pub debounce_ms: u64,
    /// Recompute interval without comment changes, so old comments age out
    pub refresh_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the daily rolling log file; empty disables file output
    pub directory: String,
    pub json: bool,
}

impl Settings {
    /// Load settings from defaults, configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("SPORTSHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::SportsHubError> {
        super::validation::validate_settings(self)
    }

    /// Socket address string the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_origins: vec![],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/sportshub".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                prefix: "sportshub:".to_string(),
                ttl_seconds: 3600,
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                access_token_minutes: 60,
                refresh_token_days: 7,
            },
            bootstrap: BootstrapConfig {
                admin_username: "admin".to_string(),
                admin_email: "admin@example.com".to_string(),
                admin_password: None,
            },
            uploads: UploadsConfig {
                dir: "media".to_string(),
                max_image_bytes: 2 * 1024 * 1024,
                public_prefix: "/media".to_string(),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_minute: 120,
                burst: 30,
            },
            wordcloud: WordCloudConfig {
                window_days: 7,
                max_comments: 400,
                max_words: 40,
                debounce_ms: 500,
                refresh_secs: 300,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: "logs".to_string(),
                json: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.bind_address(), "0.0.0.0:8000");
        assert_eq!(settings.wordcloud.max_words, 40);
        assert_eq!(settings.uploads.max_image_bytes, 2 * 1024 * 1024);
    }
}
