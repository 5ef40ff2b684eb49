//! Feedback repository implementation

use sqlx::PgPool;
use sqlx::types::Json;
use chrono::Utc;
use crate::models::Page;
use crate::models::feedback::{
    CreateFeedbackRequest, Feedback, FeedbackFilter, FeedbackStatistics, FeedbackStatus,
    UpdateFeedbackRequest,
};
use crate::utils::errors::SportsHubError;
use crate::utils::helpers::page_window;
use super::search_pattern;

const FEEDBACK_SELECT: &str = r#"
    SELECT f.id, f.user_id, u.username, f.feedback_type, f.title, f.content, f.images,
           f.contact_info, f.event_id, f.status, f.reply, f.handler_id, f.handled_at,
           f.is_anonymous, f.created_at, f.updated_at
    FROM feedback f
    JOIN users u ON u.id = f.user_id
"#;

const FEEDBACK_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR f.feedback_type = $1)
      AND ($2::text IS NULL OR f.status = $2)
      AND ($3::bigint IS NULL OR f.event_id = $3)
      AND ($4::text IS NULL OR f.title ILIKE $4 OR f.content ILIKE $4)
      AND ($5::bigint IS NULL OR f.user_id = $5)
"#;

#[derive(Debug, Clone)]
pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateFeedbackRequest, user_id: i64) -> Result<Feedback, SportsHubError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO feedback (user_id, feedback_type, title, content, images, contact_info,
                                  event_id, is_anonymous, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id
            "#
        )
        .bind(user_id)
        .bind(request.feedback_type)
        .bind(request.title.trim())
        .bind(&request.content)
        .bind(Json(&request.images))
        .bind(&request.contact_info)
        .bind(request.event)
        .bind(request.is_anonymous)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        self.get(id).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Feedback>, SportsHubError> {
        let feedback = sqlx::query_as::<_, Feedback>(&format!("{FEEDBACK_SELECT} WHERE f.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(feedback)
    }

    pub async fn get(&self, id: i64) -> Result<Feedback, SportsHubError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("Feedback", id))
    }

    pub async fn update(&self, id: i64, request: &UpdateFeedbackRequest) -> Result<Feedback, SportsHubError> {
        let result = sqlx::query(
            r#"
            UPDATE feedback
            SET feedback_type = COALESCE($2, feedback_type),
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                images = COALESCE($5, images),
                contact_info = COALESCE($6, contact_info),
                event_id = COALESCE($7, event_id),
                is_anonymous = COALESCE($8, is_anonymous),
                updated_at = $9
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(request.feedback_type)
        .bind(&request.title)
        .bind(&request.content)
        .bind(request.images.as_ref().map(Json))
        .bind(&request.contact_info)
        .bind(request.event)
        .bind(request.is_anonymous)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("Feedback", id));
        }
        self.get(id).await
    }

    /// Record an administrator's reply
    pub async fn reply(&self, id: i64, reply: &str, status: FeedbackStatus, handler_id: i64) -> Result<Feedback, SportsHubError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE feedback
            SET reply = $2, status = $3, handler_id = $4, handled_at = $5, updated_at = $5
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(reply)
        .bind(status)
        .bind(handler_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("Feedback", id));
        }
        self.get(id).await
    }

    /// Change status; handled statuses stamp the handler once
    pub async fn set_status(&self, id: i64, status: FeedbackStatus, handler_id: i64) -> Result<Feedback, SportsHubError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE feedback
            SET status = $2,
                handler_id = CASE WHEN $3 AND handler_id IS NULL THEN $4 ELSE handler_id END,
                handled_at = CASE WHEN $3 AND handled_at IS NULL THEN $5 ELSE handled_at END,
                updated_at = $5
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(status)
        .bind(status.is_handled())
        .bind(handler_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("Feedback", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM feedback WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List feedback; `only_user` restricts to one author's rows
    pub async fn list(&self, filter: &FeedbackFilter, only_user: Option<i64>) -> Result<Page<Feedback>, SportsHubError> {
        let (limit, offset) = page_window(filter.page, filter.page_size);
        let search = search_pattern(filter.search.as_deref());

        let rows = sqlx::query_as::<_, Feedback>(&format!(
            "{FEEDBACK_SELECT} {FEEDBACK_FILTER} ORDER BY f.created_at DESC LIMIT $6 OFFSET $7"
        ))
        .bind(filter.feedback_type)
        .bind(filter.status)
        .bind(filter.event)
        .bind(&search)
        .bind(only_user)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM feedback f {FEEDBACK_FILTER}"))
            .bind(filter.feedback_type)
            .bind(filter.status)
            .bind(filter.event)
            .bind(&search)
            .bind(only_user)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(rows, count.0, limit, offset))
    }

    pub async fn for_user(&self, user_id: i64) -> Result<Vec<Feedback>, SportsHubError> {
        let rows = sqlx::query_as::<_, Feedback>(&format!(
            "{FEEDBACK_SELECT} WHERE f.user_id = $1 ORDER BY f.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn pending(&self) -> Result<Vec<Feedback>, SportsHubError> {
        let rows = sqlx::query_as::<_, Feedback>(&format!(
            "{FEEDBACK_SELECT} WHERE f.status = 'pending' ORDER BY f.created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn statistics(&self) -> Result<FeedbackStatistics, SportsHubError> {
        let stats = sqlx::query_as::<_, FeedbackStatistics>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'processing') AS processing,
                   COUNT(*) FILTER (WHERE status = 'resolved') AS resolved,
                   COUNT(*) FILTER (WHERE status = 'closed') AS closed
            FROM feedback
            "#
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
