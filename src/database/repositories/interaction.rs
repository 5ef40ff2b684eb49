//! Likes, favorites and comments over `(target_type, target_id)` references

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::Page;
use crate::models::interaction::{Comment, Favorite, FavoriteEventInfo, Like, TargetType};
use crate::utils::errors::SportsHubError;
use crate::utils::helpers::page_window;

const LIKE_COLUMNS: &str = "id, user_id, target_type, target_id, created_at";
const FAVORITE_COLUMNS: &str = "id, user_id, target_type, target_id, remarks, created_at";

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.user_id, u.username, u.real_name AS user_real_name, u.avatar AS user_avatar,
           c.target_type, c.target_id, c.content, c.parent_id, c.reply_to_id,
           ru.username AS reply_to_username, c.is_approved, c.like_count, c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.user_id
    LEFT JOIN users ru ON ru.id = c.reply_to_id
"#;

/// `$7` hides unapproved comments
const COMMENT_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR c.target_type = $1)
      AND ($2::bigint IS NULL OR c.target_id = $2)
      AND ($3::bigint IS NULL OR c.parent_id = $3)
      AND ($4::boolean IS NULL OR NOT $4 OR c.parent_id IS NULL)
      AND ($5::boolean IS NULL OR c.is_approved = $5)
      AND ($6::text IS NULL OR c.content ILIKE $6 OR u.username ILIKE $6 OR u.real_name ILIKE $6)
      AND (NOT $7::boolean OR c.is_approved)
"#;

/// Comment list query after target resolution
#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub target_type: Option<TargetType>,
    pub target_id: Option<i64>,
    pub parent: Option<i64>,
    pub top_level: Option<bool>,
    pub is_approved: Option<bool>,
    pub search: Option<String>,
    pub approved_only: bool,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct InteractionRepository {
    pool: PgPool,
}

impl InteractionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether the referenced row exists
    pub async fn target_exists(&self, target_type: TargetType, target_id: i64) -> Result<bool, SportsHubError> {
        let count: (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM {} WHERE id = $1",
            target_type.table()
        ))
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    // Likes

    /// Insert a like; `None` when the user already liked the target
    pub async fn create_like(&self, user_id: i64, target_type: TargetType, target_id: i64) -> Result<Option<Like>, SportsHubError> {
        let like = sqlx::query_as::<_, Like>(&format!(
            r#"
            INSERT INTO likes (user_id, target_type, target_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, target_type, target_id) DO NOTHING
            RETURNING {LIKE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(target_type)
        .bind(target_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(like)
    }

    pub async fn find_like(&self, id: i64) -> Result<Option<Like>, SportsHubError> {
        let like = sqlx::query_as::<_, Like>(&format!("SELECT {LIKE_COLUMNS} FROM likes WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(like)
    }

    pub async fn delete_like(&self, id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM likes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove the user's like of a target; returns whether one existed
    pub async fn unlike(&self, user_id: i64, target_type: TargetType, target_id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND target_type = $2 AND target_id = $3")
            .bind(user_id)
            .bind(target_type)
            .bind(target_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn has_liked(&self, user_id: i64, target_type: TargetType, target_id: i64) -> Result<bool, SportsHubError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM likes WHERE user_id = $1 AND target_type = $2 AND target_id = $3"
        )
        .bind(user_id)
        .bind(target_type)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    pub async fn list_likes(
        &self,
        user_id: i64,
        target: (Option<TargetType>, Option<i64>),
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<Page<Like>, SportsHubError> {
        let (limit, offset) = page_window(page, page_size);
        let filter = r#"
            WHERE user_id = $1
              AND ($2::text IS NULL OR target_type = $2)
              AND ($3::bigint IS NULL OR target_id = $3)
        "#;

        let rows = sqlx::query_as::<_, Like>(&format!(
            "SELECT {LIKE_COLUMNS} FROM likes {filter} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(user_id)
        .bind(target.0)
        .bind(target.1)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM likes {filter}"))
            .bind(user_id)
            .bind(target.0)
            .bind(target.1)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(rows, count.0, limit, offset))
    }

    // Favorites

    /// Insert a favorite; `None` when the user already saved the target
    pub async fn create_favorite(
        &self,
        user_id: i64,
        target_type: TargetType,
        target_id: i64,
        remarks: &str,
    ) -> Result<Option<Favorite>, SportsHubError> {
        let favorite = sqlx::query_as::<_, Favorite>(&format!(
            r#"
            INSERT INTO favorites (user_id, target_type, target_id, remarks, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, target_type, target_id) DO NOTHING
            RETURNING {FAVORITE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(target_type)
        .bind(target_id)
        .bind(remarks)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(favorite)
    }

    pub async fn find_favorite(&self, id: i64) -> Result<Option<Favorite>, SportsHubError> {
        let favorite = sqlx::query_as::<_, Favorite>(&format!("SELECT {FAVORITE_COLUMNS} FROM favorites WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(favorite)
    }

    pub async fn delete_favorite(&self, id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM favorites WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unfavorite(&self, user_id: i64, target_type: TargetType, target_id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND target_type = $2 AND target_id = $3")
            .bind(user_id)
            .bind(target_type)
            .bind(target_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn has_favorited(&self, user_id: i64, target_type: TargetType, target_id: i64) -> Result<bool, SportsHubError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM favorites WHERE user_id = $1 AND target_type = $2 AND target_id = $3"
        )
        .bind(user_id)
        .bind(target_type)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    pub async fn list_favorites(
        &self,
        user_id: i64,
        target: (Option<TargetType>, Option<i64>),
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<Page<Favorite>, SportsHubError> {
        let (limit, offset) = page_window(page, page_size);
        let filter = r#"
            WHERE user_id = $1
              AND ($2::text IS NULL OR target_type = $2)
              AND ($3::bigint IS NULL OR target_id = $3)
        "#;

        let rows = sqlx::query_as::<_, Favorite>(&format!(
            "SELECT {FAVORITE_COLUMNS} FROM favorites {filter} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(user_id)
        .bind(target.0)
        .bind(target.1)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM favorites {filter}"))
            .bind(user_id)
            .bind(target.0)
            .bind(target.1)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(rows, count.0, limit, offset))
    }

    /// Event summaries for favorites pointing at events
    pub async fn favorite_event_info(&self, event_ids: &[i64]) -> Result<Vec<FavoriteEventInfo>, SportsHubError> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, FavoriteEventInfo>(
            "SELECT id, title, cover_image, event_type, start_time FROM events WHERE id = ANY($1)"
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // Comments

    pub async fn create_comment(
        &self,
        user_id: i64,
        target_type: TargetType,
        target_id: i64,
        content: &str,
        parent_id: Option<i64>,
        reply_to_id: Option<i64>,
    ) -> Result<Comment, SportsHubError> {
        let now = Utc::now();
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO comments (user_id, target_type, target_id, content, parent_id, reply_to_id,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id
            "#
        )
        .bind(user_id)
        .bind(target_type)
        .bind(target_id)
        .bind(content.trim())
        .bind(parent_id)
        .bind(reply_to_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.get_comment(id).await
    }

    pub async fn find_comment(&self, id: i64) -> Result<Option<Comment>, SportsHubError> {
        let comment = sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    pub async fn get_comment(&self, id: i64) -> Result<Comment, SportsHubError> {
        self.find_comment(id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("Comment", id))
    }

    /// Direct replies of a comment, oldest first
    pub async fn replies(&self, parent_id: i64, approved_only: bool) -> Result<Vec<Comment>, SportsHubError> {
        let rows = sqlx::query_as::<_, Comment>(&format!(
            r#"{COMMENT_SELECT}
               WHERE c.parent_id = $1 AND (NOT $2 OR c.is_approved)
               ORDER BY c.created_at ASC"#
        ))
        .bind(parent_id)
        .bind(approved_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn update_comment(&self, id: i64, content: &str) -> Result<Comment, SportsHubError> {
        let result = sqlx::query("UPDATE comments SET content = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(content.trim())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("Comment", id));
        }
        self.get_comment(id).await
    }

    pub async fn set_comment_approved(&self, id: i64, approved: bool) -> Result<Comment, SportsHubError> {
        let result = sqlx::query("UPDATE comments SET is_approved = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(approved)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("Comment", id));
        }
        self.get_comment(id).await
    }

    /// Increment the like counter, returning the new value
    pub async fn increment_comment_likes(&self, id: i64) -> Result<i32, SportsHubError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE comments SET like_count = like_count + 1 WHERE id = $1 RETURNING like_count"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.0).ok_or_else(|| SportsHubError::not_found("Comment", id))
    }

    pub async fn delete_comment(&self, id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_comments(&self, query: &CommentQuery) -> Result<Page<Comment>, SportsHubError> {
        let (limit, offset) = page_window(query.page, query.page_size);
        let search = super::search_pattern(query.search.as_deref());

        let rows = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} {COMMENT_FILTER} ORDER BY c.created_at DESC LIMIT $8 OFFSET $9"
        ))
        .bind(query.target_type)
        .bind(query.target_id)
        .bind(query.parent)
        .bind(query.top_level)
        .bind(query.is_approved)
        .bind(&search)
        .bind(query.approved_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM comments c JOIN users u ON u.id = c.user_id {COMMENT_FILTER}"
        ))
        .bind(query.target_type)
        .bind(query.target_id)
        .bind(query.parent)
        .bind(query.top_level)
        .bind(query.is_approved)
        .bind(&search)
        .bind(query.approved_only)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(rows, count.0, limit, offset))
    }

    /// Contents of approved comments created since `since`, newest first
    pub async fn recent_approved_contents(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<String>, SportsHubError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT content FROM comments
            WHERE is_approved AND created_at >= $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
