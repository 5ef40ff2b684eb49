//! Carousel slide repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::Page;
use crate::models::carousel::{
    Carousel, CarouselFilter, CarouselPosition, CreateCarouselRequest, UpdateCarouselRequest,
};
use crate::utils::errors::SportsHubError;
use crate::utils::helpers::page_window;

const CAROUSEL_COLUMNS: &str = "id, title, description, image, link_url, event_id, position, sort_order, is_active, start_time, end_time, click_count, creator_id, created_at, updated_at";

/// `$4` hides inactive slides and slides outside their window at `$5`
const CAROUSEL_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR position = $1)
      AND ($2::boolean IS NULL OR is_active = $2)
      AND ($3::bigint IS NULL OR event_id = $3)
      AND (NOT $4::boolean OR (is_active
           AND (start_time IS NULL OR start_time <= $5)
           AND (end_time IS NULL OR end_time >= $5)))
"#;

const CAROUSEL_ORDER: &str = "sort_order ASC, created_at DESC";

#[derive(Debug, Clone)]
pub struct CarouselRepository {
    pool: PgPool,
}

impl CarouselRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateCarouselRequest, creator_id: i64) -> Result<Carousel, SportsHubError> {
        let carousel = sqlx::query_as::<_, Carousel>(&format!(
            r#"
            INSERT INTO carousels (title, description, image, link_url, event_id, position, sort_order,
                                   is_active, start_time, end_time, creator_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {CAROUSEL_COLUMNS}
            "#
        ))
        .bind(request.title.trim())
        .bind(&request.description)
        .bind(&request.image)
        .bind(&request.link_url)
        .bind(request.event)
        .bind(request.position)
        .bind(request.sort_order)
        .bind(request.is_active)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(creator_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(carousel)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Carousel>, SportsHubError> {
        let carousel = sqlx::query_as::<_, Carousel>(&format!("SELECT {CAROUSEL_COLUMNS} FROM carousels WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(carousel)
    }

    pub async fn get(&self, id: i64) -> Result<Carousel, SportsHubError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("Carousel", id))
    }

    pub async fn update(&self, id: i64, request: &UpdateCarouselRequest) -> Result<Carousel, SportsHubError> {
        let carousel = sqlx::query_as::<_, Carousel>(&format!(
            r#"
            UPDATE carousels
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                image = COALESCE($4, image),
                link_url = COALESCE($5, link_url),
                event_id = COALESCE($6, event_id),
                position = COALESCE($7, position),
                sort_order = COALESCE($8, sort_order),
                is_active = COALESCE($9, is_active),
                start_time = COALESCE($10, start_time),
                end_time = COALESCE($11, end_time),
                updated_at = $12
            WHERE id = $1
            RETURNING {CAROUSEL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.image)
        .bind(&request.link_url)
        .bind(request.event)
        .bind(request.position)
        .bind(request.sort_order)
        .bind(request.is_active)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SportsHubError::not_found("Carousel", id))?;

        Ok(carousel)
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<Carousel, SportsHubError> {
        let carousel = sqlx::query_as::<_, Carousel>(&format!(
            "UPDATE carousels SET is_active = $2, updated_at = $3 WHERE id = $1 RETURNING {CAROUSEL_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SportsHubError::not_found("Carousel", id))?;

        Ok(carousel)
    }

    /// Increment the click counter, returning the new value
    pub async fn increment_click(&self, id: i64) -> Result<i32, SportsHubError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE carousels SET click_count = click_count + 1 WHERE id = $1 RETURNING click_count"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.0).ok_or_else(|| SportsHubError::not_found("Carousel", id))
    }

    pub async fn delete(&self, id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM carousels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List slides; `live_only` keeps active slides inside their window
    pub async fn list(&self, filter: &CarouselFilter, live_only: bool, now: DateTime<Utc>) -> Result<Page<Carousel>, SportsHubError> {
        let (limit, offset) = page_window(filter.page, filter.page_size);

        let rows = sqlx::query_as::<_, Carousel>(&format!(
            "SELECT {CAROUSEL_COLUMNS} FROM carousels {CAROUSEL_FILTER} ORDER BY {CAROUSEL_ORDER} LIMIT $6 OFFSET $7"
        ))
        .bind(filter.position)
        .bind(filter.is_active)
        .bind(filter.event)
        .bind(live_only)
        .bind(now)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM carousels {CAROUSEL_FILTER}"))
            .bind(filter.position)
            .bind(filter.is_active)
            .bind(filter.event)
            .bind(live_only)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(rows, count.0, limit, offset))
    }

    /// Live slides, optionally for one position
    pub async fn live(&self, position: Option<CarouselPosition>, now: DateTime<Utc>) -> Result<Vec<Carousel>, SportsHubError> {
        let rows = sqlx::query_as::<_, Carousel>(&format!(
            r#"SELECT {CAROUSEL_COLUMNS} FROM carousels
               WHERE ($1::text IS NULL OR position = $1)
                 AND is_active
                 AND (start_time IS NULL OR start_time <= $2)
                 AND (end_time IS NULL OR end_time >= $2)
               ORDER BY {CAROUSEL_ORDER}"#
        ))
        .bind(position)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
