//! User model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::utils::errors::{Result, SportsHubError};
use crate::utils::helpers::{is_valid_email, is_valid_phone};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Athlete,
    Organizer,
    Referee,
    Admin,
}

impl Default for UserType {
    fn default() -> Self {
        UserType::Athlete
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum Gender {
    M,
    F,
    O,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub real_name: String,
    pub phone: String,
    pub user_type: UserType,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub id_card: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub organization: String,
    pub bio: String,
    pub avatar: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub is_superuser: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.is_superuser || self.user_type == UserType::Admin
    }

    /// Name shown in exports and leaderboards
    pub fn display_name(&self) -> &str {
        if self.real_name.is_empty() {
            &self.username
        } else {
            &self.real_name
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_type: Option<UserType>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub organization: Option<String>,
}

impl RegisterUserRequest {
    pub fn validate(&self) -> Result<()> {
        let username = self.username.trim();
        if username.is_empty() || username.chars().count() > 150 {
            return Err(SportsHubError::invalid("Username must be 1-150 characters"));
        }
        if self.password != self.password_confirm {
            return Err(SportsHubError::invalid("Passwords do not match"));
        }
        validate_password(&self.password)?;
        if self.user_type == Some(UserType::Admin) {
            return Err(SportsHubError::invalid("Cannot self-register as admin"));
        }
        validate_contact(self.email.as_deref(), self.phone.as_deref())
    }
}

/// Partial profile update; admin-only fields are ignored unless the caller is an admin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub real_name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub id_card: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub organization: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub user_type: Option<UserType>,
    pub is_verified: Option<bool>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<()> {
        validate_contact(self.email.as_deref(), self.phone.as_deref())?;
        if let Some(phone) = self.emergency_phone.as_deref().filter(|p| !p.is_empty()) {
            if !is_valid_phone(phone) {
                return Err(SportsHubError::invalid("Emergency phone must be 11 digits"));
            }
        }
        Ok(())
    }

    /// Drop the fields only an administrator may change
    pub fn without_admin_fields(mut self) -> Self {
        self.user_type = None;
        self.is_verified = None;
        self.is_active = None;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<()> {
        if self.new_password != self.new_password_confirm {
            return Err(SportsHubError::invalid("New passwords do not match"));
        }
        validate_password(&self.new_password)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserFilter {
    pub user_type: Option<UserType>,
    pub is_verified: Option<bool>,
    pub is_active: Option<bool>,
    pub gender: Option<Gender>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SportsHubError::invalid(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(SportsHubError::invalid("Password cannot be entirely numeric"));
    }
    Ok(())
}

fn validate_contact(email: Option<&str>, phone: Option<&str>) -> Result<()> {
    if let Some(email) = email.filter(|e| !e.is_empty()) {
        if !is_valid_email(email) {
            return Err(SportsHubError::invalid("Invalid email address"));
        }
    }
    if let Some(phone) = phone.filter(|p| !p.is_empty()) {
        if !is_valid_phone(phone) {
            return Err(SportsHubError::invalid("Phone number must be 11 digits"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(password: &str, confirm: &str) -> RegisterUserRequest {
        RegisterUserRequest {
            username: "runner".into(),
            email: Some("runner@example.com".into()),
            password: password.into(),
            password_confirm: confirm.into(),
            real_name: None,
            phone: Some("13800138000".into()),
            user_type: None,
            gender: None,
            birth_date: None,
            organization: None,
        }
    }

    #[test]
    fn test_register_requires_matching_passwords() {
        assert!(register("s3cretpass", "s3cretpass").validate().is_ok());
        assert!(register("s3cretpass", "different1").validate().is_err());
    }

    #[test]
    fn test_register_rejects_admin_role() {
        let mut req = register("s3cretpass", "s3cretpass");
        req.user_type = Some(UserType::Admin);
        assert!(req.validate().is_err());
        req.user_type = Some(UserType::Referee);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_numeric_password_rejected() {
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_user_type_serde_names() {
        assert_eq!(serde_json::to_string(&UserType::Referee).unwrap(), "\"referee\"");
        let gender: Gender = serde_json::from_str("\"F\"").unwrap();
        assert_eq!(gender, Gender::F);
    }

    #[test]
    fn test_without_admin_fields() {
        let req = UpdateUserRequest {
            is_active: Some(false),
            user_type: Some(UserType::Admin),
            bio: Some("hi".into()),
            ..Default::default()
        }
        .without_admin_fields();
        assert!(req.is_active.is_none());
        assert!(req.user_type.is_none());
        assert_eq!(req.bio.as_deref(), Some("hi"));
    }
}
