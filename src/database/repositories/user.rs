//! User repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::Page;
use crate::models::event::OrganizerInfo;
use crate::models::user::{RegisterUserRequest, UpdateUserRequest, User, UserFilter, UserType};
use crate::utils::errors::SportsHubError;
use crate::utils::helpers::page_window;
use super::{order_clause, search_pattern};

const USER_COLUMNS: &str = "id, username, email, password_hash, real_name, phone, user_type, gender, birth_date, id_card, emergency_contact, emergency_phone, organization, bio, avatar, is_verified, is_active, is_superuser, last_login_at, created_at, updated_at";

const USER_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR user_type = $1)
      AND ($2::boolean IS NULL OR is_verified = $2)
      AND ($3::boolean IS NULL OR is_active = $3)
      AND ($4::text IS NULL OR gender = $4)
      AND ($5::text IS NULL OR username ILIKE $5 OR real_name ILIKE $5 OR phone ILIKE $5
           OR email ILIKE $5 OR organization ILIKE $5)
"#;

const USER_ORDERING: &[(&str, &str)] = &[
    ("created_at", "created_at"),
    ("username", "username"),
    ("id", "id"),
];

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with an already hashed password
    pub async fn create(
        &self,
        request: &RegisterUserRequest,
        password_hash: &str,
        is_superuser: bool,
    ) -> Result<User, SportsHubError> {
        let user_type = if is_superuser {
            UserType::Admin
        } else {
            request.user_type.unwrap_or_default()
        };

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, real_name, phone, user_type, gender,
                               birth_date, organization, is_superuser, is_verified, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10, $11, $11)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(request.username.trim())
        .bind(request.email.clone().unwrap_or_default())
        .bind(password_hash)
        .bind(request.real_name.clone().unwrap_or_default())
        .bind(request.phone.clone().unwrap_or_default())
        .bind(user_type)
        .bind(request.gender)
        .bind(request.birth_date)
        .bind(request.organization.clone().unwrap_or_default())
        .bind(is_superuser)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, SportsHubError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find user by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, SportsHubError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool, SportsHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0 > 0)
    }

    pub async fn superuser_exists(&self) -> Result<bool, SportsHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE is_superuser")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0 > 0)
    }

    /// Update user
    pub async fn update(&self, id: i64, request: &UpdateUserRequest) -> Result<User, SportsHubError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                real_name = COALESCE($3, real_name),
                phone = COALESCE($4, phone),
                gender = COALESCE($5, gender),
                birth_date = COALESCE($6, birth_date),
                id_card = COALESCE($7, id_card),
                emergency_contact = COALESCE($8, emergency_contact),
                emergency_phone = COALESCE($9, emergency_phone),
                organization = COALESCE($10, organization),
                bio = COALESCE($11, bio),
                avatar = COALESCE($12, avatar),
                user_type = COALESCE($13, user_type),
                is_verified = COALESCE($14, is_verified),
                is_active = COALESCE($15, is_active),
                updated_at = $16
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.email)
        .bind(&request.real_name)
        .bind(&request.phone)
        .bind(request.gender)
        .bind(request.birth_date)
        .bind(&request.id_card)
        .bind(&request.emergency_contact)
        .bind(&request.emergency_phone)
        .bind(&request.organization)
        .bind(&request.bio)
        .bind(&request.avatar)
        .bind(request.user_type)
        .bind(request.is_verified)
        .bind(request.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SportsHubError::not_found("User", id))?;

        Ok(user)
    }

    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), SportsHubError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn touch_last_login(&self, id: i64) -> Result<(), SportsHubError> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete user; returns whether a row was removed
    pub async fn delete(&self, id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List users with filters and pagination
    pub async fn list(&self, filter: &UserFilter) -> Result<Page<User>, SportsHubError> {
        let (limit, offset) = page_window(filter.page, filter.page_size);
        let search = search_pattern(filter.search.as_deref());
        let order = order_clause(filter.ordering.as_deref(), USER_ORDERING, "created_at DESC");

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users {USER_FILTER} ORDER BY {order} LIMIT $6 OFFSET $7"
        ))
        .bind(filter.user_type)
        .bind(filter.is_verified)
        .bind(filter.is_active)
        .bind(filter.gender)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM users {USER_FILTER}"))
            .bind(filter.user_type)
            .bind(filter.is_verified)
            .bind(filter.is_active)
            .bind(filter.gender)
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(users, count.0, limit, offset))
    }

    pub async fn organizer_info(&self, id: i64) -> Result<Option<OrganizerInfo>, SportsHubError> {
        let info = sqlx::query_as::<_, OrganizerInfo>(
            "SELECT id, username, real_name, organization FROM users WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(info)
    }

    /// Count total users
    pub async fn count(&self) -> Result<i64, SportsHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
