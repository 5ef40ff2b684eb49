//! Referee assignments and referee event access

use sqlx::PgPool;
use chrono::Utc;
use crate::models::event::{
    AssignmentFilter, CreateAssignmentRequest, EventAssignment, RefereeEventAccess,
    UpdateAssignmentRequest,
};
use crate::utils::errors::SportsHubError;

const ASSIGNMENT_SELECT: &str = r#"
    SELECT a.id, a.event_id, e.title AS event_title, a.referee_id,
           u.username AS referee_username, u.real_name AS referee_name,
           a.round_type, a.notes, a.assigned_by, a.assigned_at
    FROM event_assignments a
    JOIN events e ON e.id = a.event_id
    JOIN users u ON u.id = a.referee_id
"#;

const ACCESS_SELECT: &str = r#"
    SELECT r.id, r.referee_id, u.username AS referee_username, r.event_id,
           e.title AS event_title, r.created_at
    FROM referee_event_access r
    JOIN events e ON e.id = r.event_id
    JOIN users u ON u.id = r.referee_id
"#;

#[derive(Debug, Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateAssignmentRequest, assigned_by: i64) -> Result<EventAssignment, SportsHubError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO event_assignments (event_id, referee_id, round_type, notes, assigned_by, assigned_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#
        )
        .bind(request.event_id)
        .bind(request.referee_id)
        .bind(request.round_type)
        .bind(&request.notes)
        .bind(assigned_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        self.get(id).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<EventAssignment>, SportsHubError> {
        let assignment = sqlx::query_as::<_, EventAssignment>(&format!("{ASSIGNMENT_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(assignment)
    }

    pub async fn get(&self, id: i64) -> Result<EventAssignment, SportsHubError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("EventAssignment", id))
    }

    pub async fn update(&self, id: i64, request: &UpdateAssignmentRequest) -> Result<EventAssignment, SportsHubError> {
        let result = sqlx::query(
            r#"
            UPDATE event_assignments
            SET referee_id = COALESCE($2, referee_id),
                round_type = COALESCE($3, round_type),
                notes = COALESCE($4, notes)
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(request.referee_id)
        .bind(request.round_type)
        .bind(&request.notes)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("EventAssignment", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM event_assignments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List assignments; `only_referee` restricts rows to one referee
    pub async fn list(&self, filter: &AssignmentFilter, only_referee: Option<i64>) -> Result<Vec<EventAssignment>, SportsHubError> {
        let assignments = sqlx::query_as::<_, EventAssignment>(&format!(
            r#"{ASSIGNMENT_SELECT}
               WHERE ($1::bigint IS NULL OR a.event_id = $1)
                 AND ($2::bigint IS NULL OR a.referee_id = $2)
                 AND ($3::text IS NULL OR a.round_type = $3)
                 AND ($4::bigint IS NULL OR a.referee_id = $4)
               ORDER BY a.assigned_at DESC"#
        ))
        .bind(filter.event)
        .bind(filter.referee)
        .bind(filter.round_type)
        .bind(only_referee)
        .fetch_all(&self.pool)
        .await?;

        Ok(assignments)
    }

    /// Referee event access rows, optionally for one referee
    pub async fn list_access(&self, referee_id: Option<i64>) -> Result<Vec<RefereeEventAccess>, SportsHubError> {
        let rows = sqlx::query_as::<_, RefereeEventAccess>(&format!(
            "{ACCESS_SELECT} WHERE ($1::bigint IS NULL OR r.referee_id = $1) ORDER BY r.created_at DESC"
        ))
        .bind(referee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Replace the referee's accessible events in one transaction
    pub async fn replace_access(&self, referee_id: i64, event_ids: &[i64]) -> Result<Vec<RefereeEventAccess>, SportsHubError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM referee_event_access WHERE referee_id = $1")
            .bind(referee_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        for event_id in event_ids {
            sqlx::query(
                r#"
                INSERT INTO referee_event_access (referee_id, event_id, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (referee_id, event_id) DO NOTHING
                "#
            )
            .bind(referee_id)
            .bind(event_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.list_access(Some(referee_id)).await
    }

    /// Ids of events the referee may record results for
    pub async fn accessible_event_ids(&self, referee_id: i64) -> Result<Vec<i64>, SportsHubError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT event_id FROM referee_event_access WHERE referee_id = $1 ORDER BY event_id"
        )
        .bind(referee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
