//! Registration repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::Utc;
use crate::models::Page;
use crate::models::registration::{
    ParticipantDetails, Registration, RegistrationFilter, RegistrationStatus,
};
use crate::models::event::Event;
use crate::utils::errors::SportsHubError;
use crate::utils::helpers::page_window;
use super::{order_clause, search_pattern};

const REGISTRATION_SELECT: &str = r#"
    SELECT r.id, r.event_id, e.title AS event_title, r.user_id, u.username,
           u.real_name AS user_real_name, r.status, r.registration_number,
           r.participant_name, r.participant_phone, r.participant_id_card,
           r.participant_gender, r.participant_birth_date, r.participant_organization,
           r.emergency_contact, r.emergency_phone, r.payment_status, r.payment_amount,
           r.payment_time, r.remarks, r.review_remarks, r.reviewed_by, r.reviewed_at,
           r.created_at, r.updated_at
    FROM registrations r
    JOIN events e ON e.id = r.event_id
    JOIN users u ON u.id = r.user_id
"#;

const REGISTRATION_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR r.status = $1)
      AND ($2::text IS NULL OR r.payment_status = $2)
      AND ($3::bigint IS NULL OR r.event_id = $3)
      AND ($4::bigint IS NULL OR r.user_id = $4)
      AND ($5::text IS NULL OR r.registration_number ILIKE $5 OR r.participant_name ILIKE $5
           OR r.participant_phone ILIKE $5 OR r.participant_id_card ILIKE $5
           OR e.title ILIKE $5 OR u.username ILIKE $5)
      AND ($6::bigint IS NULL OR r.user_id = $6)
"#;

const REGISTRATION_ORDERING: &[(&str, &str)] = &[
    ("created_at", "r.created_at"),
    ("status", "r.status"),
];

#[derive(Debug, Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a pending registration inside the caller's transaction
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        event: &Event,
        user_id: i64,
        registration_number: &str,
        details: &ParticipantDetails,
    ) -> Result<i64, SportsHubError> {
        let now = Utc::now();
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO registrations (event_id, user_id, status, registration_number, participant_name,
                                       participant_phone, participant_id_card, participant_gender,
                                       participant_birth_date, participant_organization, emergency_contact,
                                       emergency_phone, payment_amount, remarks, created_at, updated_at)
            VALUES ($1, $2, 'pending', $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING id
            "#
        )
        .bind(event.id)
        .bind(user_id)
        .bind(registration_number)
        .bind(details.participant_name.clone().unwrap_or_default())
        .bind(details.participant_phone.clone().unwrap_or_default())
        .bind(details.participant_id_card.clone().unwrap_or_default())
        .bind(details.participant_gender)
        .bind(details.participant_birth_date)
        .bind(details.participant_organization.clone().unwrap_or_default())
        .bind(details.emergency_contact.clone().unwrap_or_default())
        .bind(details.emergency_phone.clone().unwrap_or_default())
        .bind(event.registration_fee)
        .bind(details.remarks.clone().unwrap_or_default())
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    pub async fn exists_for(&self, conn: &mut PgConnection, event_id: i64, user_id: i64) -> Result<bool, SportsHubError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND user_id = $2"
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(conn)
        .await?;

        Ok(count.0 > 0)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Registration>, SportsHubError> {
        let registration = sqlx::query_as::<_, Registration>(&format!("{REGISTRATION_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(registration)
    }

    pub async fn get(&self, id: i64) -> Result<Registration, SportsHubError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("Registration", id))
    }

    /// Lock the registration row for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: i64) -> Result<Registration, SportsHubError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "{REGISTRATION_SELECT} WHERE r.id = $1 FOR UPDATE OF r"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| SportsHubError::not_found("Registration", id))?;

        Ok(registration)
    }

    /// Move a registration to `status`; reviewer fields are stamped when given
    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        id: i64,
        status: RegistrationStatus,
        reviewer: Option<i64>,
        review_remarks: Option<&str>,
    ) -> Result<(), SportsHubError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE registrations
            SET status = $2,
                reviewed_by = COALESCE($3, reviewed_by),
                reviewed_at = CASE WHEN $3::bigint IS NULL THEN reviewed_at ELSE $5 END,
                review_remarks = COALESCE($4, review_remarks),
                updated_at = $5
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(status)
        .bind(reviewer)
        .bind(review_remarks)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Update participant fields and remarks
    pub async fn update_details(&self, id: i64, details: &ParticipantDetails) -> Result<Registration, SportsHubError> {
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET participant_name = COALESCE($2, participant_name),
                participant_phone = COALESCE($3, participant_phone),
                participant_id_card = COALESCE($4, participant_id_card),
                participant_gender = COALESCE($5, participant_gender),
                participant_birth_date = COALESCE($6, participant_birth_date),
                participant_organization = COALESCE($7, participant_organization),
                emergency_contact = COALESCE($8, emergency_contact),
                emergency_phone = COALESCE($9, emergency_phone),
                remarks = COALESCE($10, remarks),
                updated_at = $11
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(&details.participant_name)
        .bind(&details.participant_phone)
        .bind(&details.participant_id_card)
        .bind(details.participant_gender)
        .bind(details.participant_birth_date)
        .bind(&details.participant_organization)
        .bind(&details.emergency_contact)
        .bind(&details.emergency_phone)
        .bind(&details.remarks)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("Registration", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, conn: &mut PgConnection, id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM registrations WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lock the given rows that are in one of `statuses`, for bulk operations.
    /// `only_user` restricts to rows owned by that user.
    pub async fn lock_many(
        &self,
        conn: &mut PgConnection,
        ids: &[i64],
        statuses: &[RegistrationStatus],
        only_user: Option<i64>,
    ) -> Result<Vec<Registration>, SportsHubError> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let rows = sqlx::query_as::<_, Registration>(&format!(
            r#"{REGISTRATION_SELECT}
               WHERE r.id = ANY($1) AND r.status = ANY($2)
                 AND ($3::bigint IS NULL OR r.user_id = $3)
               ORDER BY r.id
               FOR UPDATE OF r"#
        ))
        .bind(ids)
        .bind(&statuses)
        .bind(only_user)
        .fetch_all(conn)
        .await?;

        Ok(rows)
    }

    /// List registrations; `only_user` restricts to one user's rows
    pub async fn list(&self, filter: &RegistrationFilter, only_user: Option<i64>) -> Result<Page<Registration>, SportsHubError> {
        let (limit, offset) = page_window(filter.page, filter.page_size);
        let search = search_pattern(filter.search.as_deref());
        let order = order_clause(filter.ordering.as_deref(), REGISTRATION_ORDERING, "r.created_at DESC");

        let rows = sqlx::query_as::<_, Registration>(&format!(
            "{REGISTRATION_SELECT} {REGISTRATION_FILTER} ORDER BY {order} LIMIT $7 OFFSET $8"
        ))
        .bind(filter.status)
        .bind(filter.payment_status)
        .bind(filter.event)
        .bind(filter.user)
        .bind(&search)
        .bind(only_user)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(&format!(
            r#"SELECT COUNT(*) FROM registrations r
               JOIN events e ON e.id = r.event_id
               JOIN users u ON u.id = r.user_id
               {REGISTRATION_FILTER}"#
        ))
        .bind(filter.status)
        .bind(filter.payment_status)
        .bind(filter.event)
        .bind(filter.user)
        .bind(&search)
        .bind(only_user)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(rows, count.0, limit, offset))
    }

    /// All registrations of a user, newest first
    pub async fn for_user(&self, user_id: i64) -> Result<Vec<Registration>, SportsHubError> {
        let rows = sqlx::query_as::<_, Registration>(&format!(
            "{REGISTRATION_SELECT} WHERE r.user_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Registrations of an event, oldest first, optionally by status
    pub async fn for_event(&self, event_id: i64, status: Option<RegistrationStatus>) -> Result<Vec<Registration>, SportsHubError> {
        let rows = sqlx::query_as::<_, Registration>(&format!(
            r#"{REGISTRATION_SELECT}
               WHERE r.event_id = $1 AND ($2::text IS NULL OR r.status = $2)
               ORDER BY r.created_at ASC"#
        ))
        .bind(event_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Approved registrations without any recorded result; `events` limits
    /// the count to those events when given
    pub async fn count_without_result(&self, events: Option<&[i64]>) -> Result<i64, SportsHubError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM registrations r
            WHERE r.status = 'approved'
              AND ($1::bigint[] IS NULL OR r.event_id = ANY($1))
              AND NOT EXISTS (SELECT 1 FROM results s WHERE s.registration_id = r.id)
            "#
        )
        .bind(events)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
