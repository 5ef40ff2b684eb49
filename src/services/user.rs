//! User service implementation
//!
//! This service handles account registration, login and token refresh,
//! profile and password changes, and first-boot administrator provisioning.

use tracing::{debug, info, warn};
use crate::config::BootstrapConfig;
use crate::database::repositories::UserRepository;
use crate::models::Page;
use crate::models::user::{ChangePasswordRequest, RegisterUserRequest, UpdateUserRequest, User, UserFilter};
use crate::services::auth::{AuthContext, AuthService, Permission, Claims, LoginRequest, TokenPair, TokenType};
use crate::services::redis::RedisService;
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::helpers::generate_password;
use crate::utils::logging::{log_admin_action, log_user_action};

/// User service for managing account operations
#[derive(Debug, Clone)]
pub struct UserService {
    user_repository: UserRepository,
    auth: AuthService,
    redis: RedisService,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(user_repository: UserRepository, auth: AuthService, redis: RedisService) -> Self {
        Self {
            user_repository,
            auth,
            redis,
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Register a new account
    pub async fn register(&self, request: RegisterUserRequest) -> Result<User> {
        request.validate()?;

        if self.user_repository.username_exists(request.username.trim()).await? {
            return Err(SportsHubError::Conflict("Username is already taken".to_string()));
        }

        let hash = self.auth.hash_password(&request.password)?;
        let user = self
            .user_repository
            .create(&request, &hash, false)
            .await
            .map_err(|e| e.unique_as_conflict("Username is already taken"))?;

        log_user_action(user.id, "register", None);
        Ok(user)
    }

    /// Check credentials and issue a token pair
    pub async fn login(&self, request: &LoginRequest) -> Result<(User, TokenPair)> {
        debug!(username = %request.username, "Login attempt");

        let invalid = || SportsHubError::Authentication("Invalid username or password".to_string());
        let user = self
            .user_repository
            .find_by_username(request.username.trim())
            .await?
            .ok_or_else(invalid)?;

        if !self.auth.verify_password(&request.password, &user.password_hash)? {
            warn!(user_id = user.id, "Login failed: wrong password");
            return Err(invalid());
        }
        if !user.is_active {
            return Err(SportsHubError::Authentication("Account is disabled".to_string()));
        }

        self.user_repository.touch_last_login(user.id).await?;
        let pair = self.auth.issue_pair(&user)?;

        log_user_action(user.id, "login", None);
        Ok((user, pair))
    }

    /// Exchange a refresh token for a new pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.auth.decode(refresh_token, TokenType::Refresh)?;
        if self.redis.is_token_revoked(&claims.jti).await {
            return Err(SportsHubError::Authentication("Token has been revoked".to_string()));
        }

        let user = self.active_user(claims.user_id()?).await?;
        self.auth.issue_pair(&user)
    }

    /// Decode an access token and load its still-active user
    pub async fn authenticate(&self, access_token: &str) -> Result<(Claims, AuthContext)> {
        let claims = self.auth.decode(access_token, TokenType::Access)?;
        if self.redis.is_token_revoked(&claims.jti).await {
            return Err(SportsHubError::Authentication("Token has been revoked".to_string()));
        }

        let user = self.active_user(claims.user_id()?).await?;
        Ok((claims, AuthContext::from_user(&user)))
    }

    /// Validate any token and return its claims
    pub async fn verify(&self, token: &str) -> Result<Claims> {
        let claims = self
            .auth
            .decode(token, TokenType::Access)
            .or_else(|_| self.auth.decode(token, TokenType::Refresh))?;
        if self.redis.is_token_revoked(&claims.jti).await {
            return Err(SportsHubError::Authentication("Token has been revoked".to_string()));
        }
        Ok(claims)
    }

    /// Revoke the presented access token until it expires
    pub async fn logout(&self, claims: &Claims) -> Result<()> {
        self.redis.revoke_token(&claims.jti, claims.remaining_secs()).await;
        log_user_action(claims.user_id()?, "logout", None);
        Ok(())
    }

    async fn active_user(&self, user_id: i64) -> Result<User> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| SportsHubError::Authentication("User no longer exists".to_string()))?;
        if !user.is_active {
            return Err(SportsHubError::Authentication("Account is disabled".to_string()));
        }
        Ok(user)
    }

    pub async fn get(&self, user_id: i64) -> Result<User> {
        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("User", user_id))
    }

    /// A user record as seen by its owner or an administrator
    pub async fn get_visible(&self, ctx: &AuthContext, user_id: i64) -> Result<User> {
        ctx.require_owner_or_admin(user_id)?;
        self.get(user_id).await
    }

    pub async fn list(&self, ctx: &AuthContext, filter: &UserFilter) -> Result<Page<User>> {
        ctx.require(Permission::Admin)?;
        self.user_repository.list(filter).await
    }

    /// Update a profile; role, verification and activity flags need an administrator
    pub async fn update_profile(&self, ctx: &AuthContext, user_id: i64, request: UpdateUserRequest) -> Result<User> {
        ctx.require_owner_or_admin(user_id)?;
        request.validate()?;

        let request = if ctx.is_admin() {
            request
        } else {
            request.without_admin_fields()
        };

        let user = self.user_repository.update(user_id, &request).await?;
        if ctx.user_id != user_id {
            log_admin_action(ctx.user_id, "update_user", Some(&user_id.to_string()), None);
        } else {
            log_user_action(user_id, "update_profile", None);
        }
        Ok(user)
    }

    pub async fn change_password(&self, user_id: i64, request: &ChangePasswordRequest) -> Result<()> {
        request.validate()?;

        let user = self.get(user_id).await?;
        if !self.auth.verify_password(&request.old_password, &user.password_hash)? {
            return Err(SportsHubError::invalid("Old password is incorrect"));
        }

        let hash = self.auth.hash_password(&request.new_password)?;
        self.user_repository.set_password(user_id, &hash).await?;

        log_user_action(user_id, "change_password", None);
        Ok(())
    }

    pub async fn delete(&self, ctx: &AuthContext, user_id: i64) -> Result<()> {
        ctx.require(Permission::Admin)?;
        if !self.user_repository.delete(user_id).await? {
            return Err(SportsHubError::not_found("User", user_id));
        }
        log_admin_action(ctx.user_id, "delete_user", Some(&user_id.to_string()), None);
        Ok(())
    }

    /// Provision the first superuser when none exists
    pub async fn bootstrap_admin(&self, config: &BootstrapConfig) -> Result<Option<User>> {
        if self.user_repository.superuser_exists().await? {
            debug!("Superuser already present, skipping bootstrap");
            return Ok(None);
        }
        if let Some(existing) = self.user_repository.find_by_username(&config.admin_username).await? {
            warn!(
                user_id = existing.id,
                username = %existing.username,
                "Bootstrap username belongs to a regular account, not provisioning an administrator"
            );
            return Ok(None);
        }

        let (password, generated) = match &config.admin_password {
            Some(password) if !password.is_empty() => (password.clone(), false),
            _ => (generate_password(16), true),
        };

        let request = RegisterUserRequest {
            username: config.admin_username.clone(),
            email: Some(config.admin_email.clone()),
            password: password.clone(),
            password_confirm: password.clone(),
            real_name: None,
            phone: None,
            user_type: None,
            gender: None,
            birth_date: None,
            organization: None,
        };
        let hash = self.auth.hash_password(&password)?;
        let user = self.user_repository.create(&request, &hash, true).await?;

        if generated {
            warn!(
                username = %user.username,
                password = %password,
                "Provisioned administrator with a generated password; change it after first login"
            );
        } else {
            info!(username = %user.username, "Provisioned administrator");
        }
        Ok(Some(user))
    }
}
