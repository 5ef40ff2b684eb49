//! Event repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::Page;
use crate::models::event::{CreateEventRequest, Event, EventFilter, UpdateEventRequest};
use crate::utils::errors::SportsHubError;
use crate::utils::helpers::page_window;
use super::{order_clause, search_pattern};

const EVENT_COLUMNS: &str = "e.id, e.title, e.description, e.cover_image, e.event_type, e.level, e.status, e.location, e.start_time, e.end_time, e.registration_start, e.registration_end, e.max_participants, e.current_participants, e.registration_fee, e.rules, e.requirements, e.prizes, e.organizer_id, u.username AS organizer_username, u.real_name AS organizer_name, e.contact_person, e.contact_phone, e.contact_email, e.view_count, e.is_featured, e.created_at, e.updated_at";

const EVENT_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR e.event_type = $1)
      AND ($2::text IS NULL OR e.level = $2)
      AND ($3::text IS NULL
           OR ($3 = 'finished' AND (e.status = 'finished'
                                    OR (e.status IN ('published', 'ongoing') AND e.end_time < $6)))
           OR ($3 <> 'finished' AND e.status = $3))
      AND ($4::boolean IS NULL OR e.is_featured = $4)
      AND ($5::text IS NULL OR e.title ILIKE $5 OR e.description ILIKE $5
           OR e.location ILIKE $5 OR e.event_type ILIKE $5)
"#;

const EVENT_ORDERING: &[(&str, &str)] = &[
    ("created_at", "e.created_at"),
    ("start_time", "e.start_time"),
    ("view_count", "e.view_count"),
    ("registration_end", "e.registration_end"),
];

fn select_events() -> String {
    format!("SELECT {EVENT_COLUMNS} FROM events e JOIN users u ON u.id = e.organizer_id")
}

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event owned by `organizer_id`
    pub async fn create(&self, request: &CreateEventRequest, organizer_id: i64) -> Result<Event, SportsHubError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            WITH e AS (
                INSERT INTO events (title, description, cover_image, event_type, level, status, location,
                                    start_time, end_time, registration_start, registration_end,
                                    max_participants, registration_fee, rules, requirements, prizes,
                                    organizer_id, contact_person, contact_phone, contact_email, is_featured,
                                    created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $22)
                RETURNING *
            )
            SELECT {EVENT_COLUMNS} FROM e JOIN users u ON u.id = e.organizer_id
            "#
        ))
        .bind(request.title.trim())
        .bind(&request.description)
        .bind(&request.cover_image)
        .bind(&request.event_type)
        .bind(request.level)
        .bind(request.status)
        .bind(&request.location)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(request.registration_start)
        .bind(request.registration_end)
        .bind(request.max_participants)
        .bind(request.registration_fee)
        .bind(&request.rules)
        .bind(&request.requirements)
        .bind(&request.prizes)
        .bind(organizer_id)
        .bind(&request.contact_person)
        .bind(&request.contact_phone)
        .bind(&request.contact_email)
        .bind(request.is_featured)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, SportsHubError> {
        let event = sqlx::query_as::<_, Event>(&format!("{} WHERE e.id = $1", select_events()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// Find event by ID, failing with `NotFound`
    pub async fn get(&self, id: i64) -> Result<Event, SportsHubError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("Event", id))
    }

    /// Case-insensitive lookup by exact title
    pub async fn find_by_title(&self, title: &str) -> Result<Vec<Event>, SportsHubError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "{} WHERE LOWER(e.title) = LOWER($1) ORDER BY e.id",
            select_events()
        ))
        .bind(title.trim())
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Lock the event row for the rest of the transaction
    pub async fn lock_for_update(&self, conn: &mut PgConnection, id: i64) -> Result<Event, SportsHubError> {
        let event = sqlx::query_as::<_, Event>(&format!("{} WHERE e.id = $1 FOR UPDATE OF e", select_events()))
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| SportsHubError::not_found("Event", id))?;

        Ok(event)
    }

    /// Apply a delta to the participant counter, never going below zero
    pub async fn adjust_participants(&self, conn: &mut PgConnection, id: i64, delta: i32) -> Result<(), SportsHubError> {
        if delta == 0 {
            return Ok(());
        }

        sqlx::query(
            "UPDATE events SET current_participants = GREATEST(0, current_participants + $2), updated_at = $3 WHERE id = $1"
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Update event
    pub async fn update(&self, id: i64, request: &UpdateEventRequest) -> Result<Event, SportsHubError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            WITH e AS (
                UPDATE events
                SET title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    cover_image = COALESCE($4, cover_image),
                    event_type = COALESCE($5, event_type),
                    level = COALESCE($6, level),
                    status = COALESCE($7, status),
                    location = COALESCE($8, location),
                    start_time = COALESCE($9, start_time),
                    end_time = COALESCE($10, end_time),
                    registration_start = COALESCE($11, registration_start),
                    registration_end = COALESCE($12, registration_end),
                    max_participants = COALESCE($13, max_participants),
                    registration_fee = COALESCE($14, registration_fee),
                    rules = COALESCE($15, rules),
                    requirements = COALESCE($16, requirements),
                    prizes = COALESCE($17, prizes),
                    contact_person = COALESCE($18, contact_person),
                    contact_phone = COALESCE($19, contact_phone),
                    contact_email = COALESCE($20, contact_email),
                    is_featured = COALESCE($21, is_featured),
                    updated_at = $22
                WHERE id = $1
                RETURNING *
            )
            SELECT {EVENT_COLUMNS} FROM e JOIN users u ON u.id = e.organizer_id
            "#
        ))
        .bind(id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.cover_image)
        .bind(&request.event_type)
        .bind(request.level)
        .bind(request.status)
        .bind(&request.location)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(request.registration_start)
        .bind(request.registration_end)
        .bind(request.max_participants)
        .bind(request.registration_fee)
        .bind(&request.rules)
        .bind(&request.requirements)
        .bind(&request.prizes)
        .bind(&request.contact_person)
        .bind(&request.contact_phone)
        .bind(&request.contact_email)
        .bind(request.is_featured)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SportsHubError::not_found("Event", id))?;

        Ok(event)
    }

    /// Delete event
    pub async fn delete(&self, id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List events with filters and pagination
    pub async fn list(&self, filter: &EventFilter, now: DateTime<Utc>) -> Result<Page<Event>, SportsHubError> {
        let (limit, offset) = page_window(filter.page, filter.page_size);
        let search = search_pattern(filter.search.as_deref());
        let order = order_clause(filter.ordering.as_deref(), EVENT_ORDERING, "e.created_at DESC");
        let status = filter.status.map(|s| s.as_str());

        let events = sqlx::query_as::<_, Event>(&format!(
            "{} {EVENT_FILTER} ORDER BY {order} LIMIT $7 OFFSET $8",
            select_events()
        ))
        .bind(&filter.event_type)
        .bind(filter.level)
        .bind(status)
        .bind(filter.is_featured)
        .bind(&search)
        .bind(now)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM events e {EVENT_FILTER}"))
            .bind(&filter.event_type)
            .bind(filter.level)
            .bind(status)
            .bind(filter.is_featured)
            .bind(&search)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(events, count.0, limit, offset))
    }

    /// Increment view counter, returning the new value
    pub async fn increment_view(&self, id: i64) -> Result<i32, SportsHubError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE events SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.0).ok_or_else(|| SportsHubError::not_found("Event", id))
    }

    /// Featured published events
    pub async fn featured(&self) -> Result<Vec<Event>, SportsHubError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "{} WHERE e.is_featured AND e.status = 'published' ORDER BY e.start_time ASC",
            select_events()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Published events that have not started yet, soonest first
    pub async fn upcoming(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Event>, SportsHubError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "{} WHERE e.status = 'published' AND e.start_time >= $1 ORDER BY e.start_time ASC LIMIT $2",
            select_events()
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Events marked ongoing, or published and currently running
    pub async fn ongoing(&self, now: DateTime<Utc>) -> Result<Vec<Event>, SportsHubError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"{} WHERE e.status = 'ongoing'
                  OR (e.status = 'published' AND e.start_time <= $1 AND e.end_time >= $1)
               ORDER BY e.start_time ASC"#,
            select_events()
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Events currently accepting registrations
    pub async fn open_for_registration(&self, now: DateTime<Utc>) -> Result<Vec<Event>, SportsHubError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"{} WHERE e.status IN ('published', 'ongoing')
                  AND e.registration_start <= $1 AND e.registration_end >= $1
                  AND (e.max_participants = 0 OR e.current_participants < e.max_participants)
               ORDER BY e.registration_end ASC"#,
            select_events()
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Events a referee has been granted access to
    pub async fn for_referee(&self, referee_id: i64) -> Result<Vec<Event>, SportsHubError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"{} JOIN referee_event_access a ON a.event_id = e.id
               WHERE a.referee_id = $1
               ORDER BY e.start_time DESC"#,
            select_events()
        ))
        .bind(referee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    pub async fn exists(&self, id: i64) -> Result<bool, SportsHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0 > 0)
    }

    /// Count total events
    pub async fn count(&self) -> Result<i64, SportsHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
