//! Error handling for SportsHub
//!
//! This module defines the main error type used throughout the application,
//! the mapping of errors onto HTTP responses and a severity classification
//! used to pick the log level.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for SportsHub application
#[derive(Error, Debug)]
pub enum SportsHubError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Spreadsheet write error: {0}")]
    SpreadsheetWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Spreadsheet read error: {0}")]
    SpreadsheetRead(#[from] calamine::XlsxError),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type alias for SportsHub operations
pub type Result<T> = std::result::Result<T, SportsHubError>;

impl SportsHubError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        SportsHubError::NotFound { entity, id: id.to_string() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        SportsHubError::InvalidInput(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        SportsHubError::PermissionDenied(message.into())
    }

    /// Report a unique-key violation as a conflict; other errors pass through
    pub fn unique_as_conflict(self, message: &str) -> Self {
        match self {
            SportsHubError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                SportsHubError::Conflict(message.to_string())
            }
            other => other,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SportsHubError::Database(_) => ErrorSeverity::Critical,
            SportsHubError::Migration(_) => ErrorSeverity::Critical,
            SportsHubError::Config(_) => ErrorSeverity::Critical,
            SportsHubError::PermissionDenied(_) => ErrorSeverity::Warning,
            SportsHubError::Authentication(_) => ErrorSeverity::Warning,
            SportsHubError::Jwt(_) => ErrorSeverity::Warning,
            SportsHubError::RateLimitExceeded { .. } => ErrorSeverity::Warning,
            SportsHubError::InvalidInput(_)
            | SportsHubError::NotFound { .. }
            | SportsHubError::Conflict(_)
            | SportsHubError::InvalidStateTransition { .. }
            | SportsHubError::UrlParse(_)
            | SportsHubError::Multipart(_)
            | SportsHubError::SpreadsheetRead(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP status and machine readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            SportsHubError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            SportsHubError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            SportsHubError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            SportsHubError::Authentication(_) | SportsHubError::Jwt(_) => {
                (StatusCode::UNAUTHORIZED, "AUTH_ERROR")
            }
            SportsHubError::InvalidInput(_)
            | SportsHubError::UrlParse(_)
            | SportsHubError::Multipart(_)
            | SportsHubError::SpreadsheetRead(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            SportsHubError::InvalidStateTransition { .. } => {
                (StatusCode::BAD_REQUEST, "INVALID_STATE")
            }
            SportsHubError::RateLimitExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED")
            }
            SportsHubError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            SportsHubError::Database(sqlx::Error::RowNotFound) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            SportsHubError::Database(_) | SportsHubError::Migration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Message exposed to the client; internal failures stay opaque
    fn public_message(&self) -> String {
        match self {
            SportsHubError::Database(sqlx::Error::RowNotFound) => "Resource not found".to_string(),
            SportsHubError::Database(_) | SportsHubError::Migration(_) => {
                "Database operation failed".to_string()
            }
            SportsHubError::Jwt(_) => "Invalid or expired token".to_string(),
            SportsHubError::Redis(_)
            | SportsHubError::Io(_)
            | SportsHubError::Serialization(_)
            | SportsHubError::PasswordHash(_)
            | SportsHubError::SpreadsheetWrite(_)
            | SportsHubError::Config(_) => "Internal server error".to_string(),
            SportsHubError::PermissionDenied(msg)
            | SportsHubError::Authentication(msg)
            | SportsHubError::InvalidInput(msg)
            | SportsHubError::Conflict(msg)
            | SportsHubError::ServiceUnavailable(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for SportsHubError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                tracing::error!(error = %self, code = code, "Request failed")
            }
            ErrorSeverity::Warning => tracing::warn!(error = %self, code = code, "Request rejected"),
            ErrorSeverity::Info => tracing::debug!(error = %self, code = code, "Request rejected"),
        }

        let body = Json(json!({
            "code": code,
            "message": self.public_message(),
        }));

        let mut response = (status, body).into_response();
        if let SportsHubError::RateLimitExceeded { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = SportsHubError::not_found("Event", 7);
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Event not found: 7");
    }

    #[derive(Debug)]
    struct DuplicateKey;

    impl std::fmt::Display for DuplicateKey {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for DuplicateKey {}

    impl sqlx::error::DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn test_unique_violation_becomes_conflict() {
        let err = SportsHubError::Database(sqlx::Error::Database(Box::new(DuplicateKey)))
            .unique_as_conflict("already exists");
        assert_eq!(err.status_and_code(), (StatusCode::CONFLICT, "CONFLICT"));
        assert_eq!(err.to_string(), "Conflict: already exists");

        let untouched = SportsHubError::Database(sqlx::Error::RowNotFound).unique_as_conflict("already exists");
        assert_eq!(untouched.status_and_code().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_row_not_found_is_404() {
        let err = SportsHubError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status_and_code(), (StatusCode::NOT_FOUND, "NOT_FOUND"));
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let err = SportsHubError::Config("secret path /etc/x".to_string());
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let response = SportsHubError::RateLimitExceeded { retry_after_secs: 3 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "3");
    }

    #[test]
    fn test_state_transition_is_bad_request() {
        let err = SportsHubError::InvalidStateTransition {
            from: "approved".into(),
            to: "approved".into(),
        };
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);
    }
}
