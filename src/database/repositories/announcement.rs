//! Announcement repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::Page;
use crate::models::announcement::{
    Announcement, AnnouncementFilter, CreateAnnouncementRequest, UpdateAnnouncementRequest,
};
use crate::utils::errors::SportsHubError;
use crate::utils::helpers::page_window;
use super::search_pattern;

const ANNOUNCEMENT_SELECT: &str = r#"
    SELECT a.id, a.title, a.content, a.summary, a.announcement_type, a.priority, a.event_id,
           a.author_id, COALESCE(NULLIF(u.real_name, ''), u.username) AS author_name,
           a.cover_image, a.attachments, a.is_published, a.is_pinned, a.view_count,
           a.publish_time, a.expire_time, a.created_at, a.updated_at
    FROM announcements a
    JOIN users u ON u.id = a.author_id
"#;

/// `$7` hides unpublished and expired rows, evaluated at `$8`
const ANNOUNCEMENT_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR a.announcement_type = $1)
      AND ($2::text IS NULL OR a.priority = $2)
      AND ($3::boolean IS NULL OR a.is_published = $3)
      AND ($4::boolean IS NULL OR a.is_pinned = $4)
      AND ($5::bigint IS NULL OR a.event_id = $5)
      AND ($6::text IS NULL OR a.title ILIKE $6 OR a.content ILIKE $6)
      AND (NOT $7::boolean OR (a.is_published AND (a.expire_time IS NULL OR a.expire_time >= $8)))
"#;

const ANNOUNCEMENT_ORDER: &str = "a.is_pinned DESC, a.publish_time DESC NULLS LAST, a.created_at DESC";

#[derive(Debug, Clone)]
pub struct AnnouncementRepository {
    pool: PgPool,
}

impl AnnouncementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateAnnouncementRequest, author_id: i64) -> Result<Announcement, SportsHubError> {
        let now = Utc::now();
        let publish_time = match (request.publish_time, request.is_published) {
            (Some(time), _) => Some(time),
            (None, true) => Some(now),
            (None, false) => None,
        };

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO announcements (title, content, summary, announcement_type, priority, event_id,
                                       author_id, cover_image, attachments, is_published, is_pinned,
                                       publish_time, expire_time, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING id
            "#
        )
        .bind(request.title.trim())
        .bind(&request.content)
        .bind(&request.summary)
        .bind(request.announcement_type)
        .bind(request.priority)
        .bind(request.event)
        .bind(author_id)
        .bind(&request.cover_image)
        .bind(&request.attachments)
        .bind(request.is_published)
        .bind(request.is_pinned)
        .bind(publish_time)
        .bind(request.expire_time)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.get(id).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Announcement>, SportsHubError> {
        let announcement = sqlx::query_as::<_, Announcement>(&format!("{ANNOUNCEMENT_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(announcement)
    }

    pub async fn get(&self, id: i64) -> Result<Announcement, SportsHubError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("Announcement", id))
    }

    /// Update; `publish_time` is stamped the first time the row is published
    pub async fn update(&self, id: i64, request: &UpdateAnnouncementRequest) -> Result<Announcement, SportsHubError> {
        let result = sqlx::query(
            r#"
            UPDATE announcements
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                summary = COALESCE($4, summary),
                announcement_type = COALESCE($5, announcement_type),
                priority = COALESCE($6, priority),
                event_id = COALESCE($7, event_id),
                cover_image = COALESCE($8, cover_image),
                attachments = COALESCE($9, attachments),
                is_published = COALESCE($10, is_published),
                is_pinned = COALESCE($11, is_pinned),
                publish_time = COALESCE($12, publish_time,
                                        CASE WHEN COALESCE($10, is_published) THEN $14 END),
                expire_time = COALESCE($13, expire_time),
                updated_at = $14
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.content)
        .bind(&request.summary)
        .bind(request.announcement_type)
        .bind(request.priority)
        .bind(request.event)
        .bind(&request.cover_image)
        .bind(&request.attachments)
        .bind(request.is_published)
        .bind(request.is_pinned)
        .bind(request.publish_time)
        .bind(request.expire_time)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("Announcement", id));
        }
        self.get(id).await
    }

    pub async fn set_published(&self, id: i64, published: bool) -> Result<Announcement, SportsHubError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE announcements
            SET is_published = $2,
                publish_time = CASE WHEN $2 THEN COALESCE(publish_time, $3) ELSE publish_time END,
                updated_at = $3
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(published)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("Announcement", id));
        }
        self.get(id).await
    }

    pub async fn set_pinned(&self, id: i64, pinned: bool) -> Result<Announcement, SportsHubError> {
        let result = sqlx::query("UPDATE announcements SET is_pinned = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(pinned)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("Announcement", id));
        }
        self.get(id).await
    }

    pub async fn increment_view(&self, id: i64) -> Result<(), SportsHubError> {
        sqlx::query("UPDATE announcements SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List announcements; `visible_only` hides unpublished and expired rows
    pub async fn list(
        &self,
        filter: &AnnouncementFilter,
        visible_only: bool,
        now: DateTime<Utc>,
    ) -> Result<Page<Announcement>, SportsHubError> {
        let (limit, offset) = page_window(filter.page, filter.page_size);
        let search = search_pattern(filter.search.as_deref());

        let rows = sqlx::query_as::<_, Announcement>(&format!(
            "{ANNOUNCEMENT_SELECT} {ANNOUNCEMENT_FILTER} ORDER BY {ANNOUNCEMENT_ORDER} LIMIT $9 OFFSET $10"
        ))
        .bind(filter.announcement_type)
        .bind(filter.priority)
        .bind(filter.is_published)
        .bind(filter.is_pinned)
        .bind(filter.event)
        .bind(&search)
        .bind(visible_only)
        .bind(now)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM announcements a {ANNOUNCEMENT_FILTER}"))
            .bind(filter.announcement_type)
            .bind(filter.priority)
            .bind(filter.is_published)
            .bind(filter.is_pinned)
            .bind(filter.event)
            .bind(&search)
            .bind(visible_only)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(rows, count.0, limit, offset))
    }

    /// Published, unexpired announcements; `pinned_only` narrows to pinned rows
    pub async fn visible(&self, now: DateTime<Utc>, pinned_only: bool, event_id: Option<i64>) -> Result<Vec<Announcement>, SportsHubError> {
        let rows = sqlx::query_as::<_, Announcement>(&format!(
            r#"{ANNOUNCEMENT_SELECT}
               WHERE a.is_published AND (a.expire_time IS NULL OR a.expire_time >= $1)
                 AND (NOT $2 OR a.is_pinned)
                 AND ($3::bigint IS NULL OR a.event_id = $3)
               ORDER BY {ANNOUNCEMENT_ORDER}"#
        ))
        .bind(now)
        .bind(pinned_only)
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
