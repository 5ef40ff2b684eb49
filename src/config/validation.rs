//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{SportsHubError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_auth_config(&settings.auth)?;
    validate_bootstrap_config(&settings.bootstrap)?;
    validate_uploads_config(&settings.uploads)?;
    validate_rate_limit_config(&settings.rate_limit)?;
    validate_wordcloud_config(&settings.wordcloud)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(SportsHubError::Config(
            "Server host is required".to_string()
        ));
    }

    if config.port == 0 {
        return Err(SportsHubError::Config(
            "Server port must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(SportsHubError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(SportsHubError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(SportsHubError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(SportsHubError::Config(
            "Redis URL is required".to_string()
        ));
    }

    Ok(())
}

fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.trim().is_empty() {
        return Err(SportsHubError::Config(
            "JWT secret is required".to_string()
        ));
    }

    if config.access_token_minutes <= 0 || config.refresh_token_days <= 0 {
        return Err(SportsHubError::Config(
            "Token lifetimes must be positive".to_string()
        ));
    }

    Ok(())
}

fn validate_bootstrap_config(config: &super::BootstrapConfig) -> Result<()> {
    if config.admin_username.trim().is_empty() {
        return Err(SportsHubError::Config(
            "Bootstrap admin username is required".to_string()
        ));
    }

    if let Some(password) = &config.admin_password {
        if password.len() < 8 {
            return Err(SportsHubError::Config(
                "Bootstrap admin password must be at least 8 characters".to_string()
            ));
        }
    }

    Ok(())
}

fn validate_uploads_config(config: &super::UploadsConfig) -> Result<()> {
    if config.dir.is_empty() {
        return Err(SportsHubError::Config(
            "Upload directory is required".to_string()
        ));
    }

    if config.max_image_bytes == 0 {
        return Err(SportsHubError::Config(
            "Max image size must be greater than 0".to_string()
        ));
    }

    Ok(())
}

fn validate_rate_limit_config(config: &super::RateLimitConfig) -> Result<()> {
    if config.enabled && (config.requests_per_minute == 0 || config.burst == 0) {
        return Err(SportsHubError::Config(
            "Rate limit quota and burst must be greater than 0".to_string()
        ));
    }

    Ok(())
}

fn validate_wordcloud_config(config: &super::WordCloudConfig) -> Result<()> {
    if config.window_days <= 0 || config.max_comments <= 0 || config.max_words == 0 {
        return Err(SportsHubError::Config(
            "Word cloud window, comment limit and word limit must be positive".to_string()
        ));
    }
    if config.refresh_secs == 0 {
        return Err(SportsHubError::Config("Word cloud refresh interval must be positive".to_string()));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(SportsHubError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(SportsHubError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_rejects_empty_database_url() {
        let mut settings = Settings::default();
        settings.database.url.clear();
        assert_matches!(validate_settings(&settings), Err(SportsHubError::Config(_)));
    }

    #[test]
    fn test_rejects_min_above_max_connections() {
        let mut settings = Settings::default();
        settings.database.min_connections = 20;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_rejects_zero_word_limit() {
        let mut settings = Settings::default();
        settings.wordcloud.max_words = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_rejects_zero_wordcloud_refresh() {
        let mut settings = Settings::default();
        settings.wordcloud.refresh_secs = 0;
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("refresh interval"));
    }

    #[test]
    fn test_disabled_rate_limit_skips_quota_check() {
        let mut settings = Settings::default();
        settings.rate_limit.enabled = false;
        settings.rate_limit.requests_per_minute = 0;
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_short_bootstrap_password() {
        let mut settings = Settings::default();
        settings.bootstrap.admin_password = Some("short".to_string());
        assert!(validate_settings(&settings).is_err());
    }
}
