//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use std::sync::OnceLock;
use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 1000;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Generate a new UUID v4
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Format a timestamp for spreadsheet cells
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Build a registration number: `REG-{event}-{YYYYMMDDHHMMSS}-{8 hex chars}`
pub fn generate_registration_number(event_id: i64, now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("REG-{}-{}-{}", event_id, now.format("%Y%m%d%H%M%S"), suffix)
}

fn email_pattern() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").ok())
        .as_ref()
}

/// Validate email format
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().map_or(false, |re| re.is_match(email))
}

/// Mobile numbers are exactly 11 ASCII digits
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 11 && phone.chars().all(|c| c.is_ascii_digit())
}

/// Normalize a `page`/`page_size` pair into `(limit, offset)`
pub fn page_window(page: Option<i64>, page_size: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (limit, calculate_offset(page, limit))
}

/// Calculate pagination offset, saturating for absurd page numbers
pub fn calculate_offset(page: i64, page_size: i64) -> i64 {
    page.saturating_sub(1).max(0).saturating_mul(page_size.max(0))
}

/// Sanitize filename for safe storage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Generate a random lowercase alphanumeric string
pub fn generate_random_string(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Generate a password containing letters, digits and symbols
pub fn generate_password(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789!@#$%^&*";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern
pub fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', r"\\")
        .replace('%', r"\%")
        .replace('_', r"\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_registration_number_shape() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 15).unwrap();
        let number = generate_registration_number(42, now);
        assert!(number.starts_with("REG-42-20240501083015-"));
        let suffix = number.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_phone_validation() {
        assert!(is_valid_phone("13800138000"));
        assert!(!is_valid_phone("1380013800"));
        assert!(!is_valid_phone("1380013800a"));
        assert!(!is_valid_phone("+8613800138"));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@b.cn"));
        assert!(!is_valid_email("ab.cn"));
        assert!(!is_valid_email("@b.cn"));
        assert!(!is_valid_email("a@cn"));
    }

    #[test]
    fn test_page_window_clamps() {
        assert_eq!(page_window(None, None), (20, 0));
        assert_eq!(page_window(Some(3), Some(10)), (10, 20));
        assert_eq!(page_window(Some(0), Some(5000)), (1000, 0));
        assert_eq!(page_window(Some(-2), Some(0)), (1, 0));
        assert_eq!(page_window(Some(i64::MAX), Some(50)), (50, i64::MAX));
        assert_eq!(calculate_offset(i64::MIN, 20), 0);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), r"%50\%\_off%");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a b/c.png"), "a_b_c.png");
    }

    #[test]
    fn test_generate_password_length() {
        assert_eq!(generate_password(16).chars().count(), 16);
        assert_eq!(generate_random_string(8).len(), 8);
    }
}
