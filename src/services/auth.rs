//! Authentication service implementation
//!
//! This service issues and verifies JWT access/refresh pairs, hashes
//! passwords with bcrypt and evaluates the role predicates every module
//! checks before acting.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::config::AuthConfig;
use crate::models::{User, UserType};
use crate::utils::errors::{Result, SportsHubError};

/// Permission levels for different operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Any active user with a valid token
    Authenticated,
    /// Managers and referees: review registrations, record results
    Reviewer,
    /// Administrators and organizers: see every registration and result
    Manager,
    /// Superusers and administrators
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims carried by both token types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub user_type: UserType,
    pub is_superuser: bool,
    pub token_type: TokenType,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| SportsHubError::Authentication("Malformed token subject".to_string()))
    }

    /// Seconds until expiry, never negative
    pub fn remaining_secs(&self) -> u64 {
        (self.exp - Utc::now().timestamp()).max(0) as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// Authentication context for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub user_type: UserType,
    pub is_superuser: bool,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            user_type: user.user_type,
            is_superuser: user.is_superuser,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.is_superuser || self.user_type == UserType::Admin
    }

    pub fn is_manager(&self) -> bool {
        self.is_admin() || self.user_type == UserType::Organizer
    }

    pub fn is_referee(&self) -> bool {
        self.user_type == UserType::Referee
    }

    pub fn is_reviewer(&self) -> bool {
        self.is_manager() || self.is_referee()
    }

    pub fn has(&self, permission: Permission) -> bool {
        match permission {
            Permission::Authenticated => true,
            Permission::Reviewer => self.is_reviewer(),
            Permission::Manager => self.is_manager(),
            Permission::Admin => self.is_admin(),
        }
    }

    /// Require specific permission or return error
    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.has(permission) {
            return Ok(());
        }
        Err(SportsHubError::forbidden(format!(
            "User {} lacks required permission: {:?}",
            self.user_id, permission
        )))
    }

    /// The row's owner, or an administrator
    pub fn owns_or_admin(&self, owner_id: i64) -> bool {
        self.user_id == owner_id || self.is_admin()
    }

    pub fn require_owner_or_admin(&self, owner_id: i64) -> Result<()> {
        if self.owns_or_admin(owner_id) {
            return Ok(());
        }
        Err(SportsHubError::forbidden("Only the owner or an administrator may do this"))
    }
}

/// Authentication service for tokens and passwords
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    hash_cost: u32,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Override the bcrypt cost; lower costs keep tests fast
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        Ok(bcrypt::hash(password, self.hash_cost)?)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, hash)?)
    }

    fn issue(&self, user: &User, token_type: TokenType, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            user_type: user.user_type,
            is_superuser: user.is_superuser,
            token_type,
            jti: crate::utils::helpers::generate_uuid(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Issue an access + refresh pair for the user
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair> {
        let pair = TokenPair {
            access: self.issue(user, TokenType::Access, self.access_ttl)?,
            refresh: self.issue(user, TokenType::Refresh, self.refresh_ttl)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        };
        info!(user_id = user.id, "Issued token pair");
        Ok(pair)
    }

    /// Decode and validate a token of the expected type
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!(error = %e, "Token rejected");
            SportsHubError::Authentication("Invalid or expired token".to_string())
        })?;

        if data.claims.token_type != expected {
            warn!(expected = ?expected, actual = ?data.claims.token_type, "Token of wrong type presented");
            return Err(SportsHubError::Authentication("Wrong token type".to_string()));
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn user(user_type: UserType, is_superuser: bool) -> User {
        let now = Utc::now();
        User {
            id: 42,
            username: "referee01".into(),
            email: String::new(),
            password_hash: String::new(),
            real_name: "李四".into(),
            phone: String::new(),
            user_type,
            gender: None,
            birth_date: None,
            id_card: String::new(),
            emergency_contact: String::new(),
            emergency_phone: String::new(),
            organization: String::new(),
            bio: String::new(),
            avatar: String::new(),
            is_verified: false,
            is_active: true,
            is_superuser,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn service() -> AuthService {
        AuthService::new(&Settings::default().auth).with_hash_cost(4)
    }

    #[test]
    fn test_token_round_trip() {
        let service = service();
        let pair = service.issue_pair(&user(UserType::Referee, false)).unwrap();

        let claims = service.decode(&pair.access, TokenType::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.user_type, UserType::Referee);
        assert!(claims.remaining_secs() > 0);
    }

    #[test]
    fn test_refresh_token_not_accepted_as_access() {
        let service = service();
        let pair = service.issue_pair(&user(UserType::Athlete, false)).unwrap();

        assert!(service.decode(&pair.refresh, TokenType::Access).is_err());
        assert!(service.decode(&pair.refresh, TokenType::Refresh).is_ok());
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let pair = service().issue_pair(&user(UserType::Athlete, false)).unwrap();
        let mut config = Settings::default().auth;
        config.jwt_secret = "another-secret-entirely".into();
        let other = AuthService::new(&config);

        assert!(other.decode(&pair.access, TokenType::Access).is_err());
    }

    #[test]
    fn test_password_hashing() {
        let service = service();
        let hash = service.hash_password("s3cret-pass").unwrap();
        assert!(service.verify_password("s3cret-pass", &hash).unwrap());
        assert!(!service.verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_role_predicates() {
        let admin = AuthContext::from_user(&user(UserType::Athlete, true));
        assert!(admin.is_admin() && admin.is_manager() && admin.is_reviewer());

        let organizer = AuthContext::from_user(&user(UserType::Organizer, false));
        assert!(!organizer.is_admin());
        assert!(organizer.has(Permission::Manager));

        let referee = AuthContext::from_user(&user(UserType::Referee, false));
        assert!(referee.has(Permission::Reviewer));
        assert!(!referee.has(Permission::Manager));

        let athlete = AuthContext::from_user(&user(UserType::Athlete, false));
        assert!(athlete.require(Permission::Reviewer).is_err());
        assert!(athlete.require(Permission::Authenticated).is_ok());
    }

    #[test]
    fn test_owner_or_admin() {
        let athlete = AuthContext::from_user(&user(UserType::Athlete, false));
        assert!(athlete.owns_or_admin(42));
        assert!(!athlete.owns_or_admin(7));
        assert!(athlete.require_owner_or_admin(7).is_err());

        let admin = AuthContext::from_user(&user(UserType::Admin, false));
        assert!(admin.owns_or_admin(7));
    }
}
