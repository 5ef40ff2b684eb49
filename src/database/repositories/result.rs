//! Competition result repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::Utc;
use crate::models::Page;
use crate::models::result::{
    CompetitionResult, CreateResultRequest, ResultFilter, RoundType, UpdateResultRequest,
};
use crate::utils::errors::SportsHubError;
use crate::utils::helpers::page_window;
use super::{order_clause, search_pattern};

const RESULT_SELECT: &str = r#"
    SELECT s.id, s.event_id, e.title AS event_title, s.registration_id, r.registration_number,
           r.participant_name, s.user_id, u.username, u.real_name AS user_real_name,
           s.round_type, s.score, s.rank, s.award, s.score_unit, s.remarks, s.certificate_url,
           s.is_published, s.recorded_by, s.created_at, s.updated_at
    FROM results s
    JOIN events e ON e.id = s.event_id
    JOIN registrations r ON r.id = s.registration_id
    JOIN users u ON u.id = s.user_id
"#;

/// `$6` restricts to published rows, `$7` lets a referee also see every row
/// of their events
const RESULT_FILTER: &str = r#"
    WHERE ($1::bigint IS NULL OR s.event_id = $1)
      AND ($2::text IS NULL OR s.round_type = $2)
      AND ($3::boolean IS NULL OR s.is_published = $3)
      AND ($4::bigint IS NULL OR s.user_id = $4)
      AND ($5::text IS NULL OR e.title ILIKE $5 OR r.participant_name ILIKE $5
           OR u.username ILIKE $5 OR u.real_name ILIKE $5 OR s.score ILIKE $5)
      AND (NOT $6::boolean OR s.is_published
           OR ($7::bigint[] IS NOT NULL AND s.event_id = ANY($7)))
"#;

const RESULT_ORDERING: &[(&str, &str)] = &[
    ("rank", "s.rank"),
    ("created_at", "s.created_at"),
    ("score", "s.score"),
];

const ROUND_ORDER: &str =
    "CASE s.round_type WHEN 'final' THEN 0 WHEN 'semifinal' THEN 1 ELSE 2 END";

/// Which results a caller may see or modify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultScope {
    /// Managers see and modify everything
    All,
    /// Referees act on their accessible events and also see published rows
    Referee(Vec<i64>),
    /// Everyone else sees published rows only
    Published,
}

impl ResultScope {
    fn published_only(&self) -> bool {
        !matches!(self, ResultScope::All)
    }

    fn referee_events(&self) -> Option<&[i64]> {
        match self {
            ResultScope::Referee(events) => Some(events.as_slice()),
            _ => None,
        }
    }

    /// Events the caller may modify; `None` means unrestricted
    pub fn writable_events(&self) -> Option<&[i64]> {
        match self {
            ResultScope::All => None,
            ResultScope::Referee(events) => Some(events.as_slice()),
            ResultScope::Published => Some(&[]),
        }
    }

    pub fn can_write(&self, event_id: i64) -> bool {
        self.writable_events().map_or(true, |events| events.contains(&event_id))
    }
}

#[derive(Debug, Clone)]
pub struct ResultRepository {
    pool: PgPool,
}

impl ResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a result inside the caller's transaction
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        request: &CreateResultRequest,
        user_id: i64,
        recorded_by: i64,
    ) -> Result<i64, SportsHubError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO results (event_id, registration_id, user_id, round_type, score, rank, award,
                                 score_unit, remarks, certificate_url, is_published, recorded_by,
                                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING id
            "#
        )
        .bind(request.event)
        .bind(request.registration)
        .bind(user_id)
        .bind(request.round_type)
        .bind(request.score.trim())
        .bind(request.rank)
        .bind(&request.award)
        .bind(&request.score_unit)
        .bind(&request.remarks)
        .bind(&request.certificate_url)
        .bind(request.is_published)
        .bind(recorded_by)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    pub async fn exists_for(
        &self,
        conn: &mut PgConnection,
        event_id: i64,
        registration_id: i64,
        round_type: RoundType,
    ) -> Result<bool, SportsHubError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM results WHERE event_id = $1 AND registration_id = $2 AND round_type = $3"
        )
        .bind(event_id)
        .bind(registration_id)
        .bind(round_type)
        .fetch_one(conn)
        .await?;

        Ok(count.0 > 0)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<CompetitionResult>, SportsHubError> {
        let result = sqlx::query_as::<_, CompetitionResult>(&format!("{RESULT_SELECT} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result)
    }

    pub async fn get(&self, id: i64) -> Result<CompetitionResult, SportsHubError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("Result", id))
    }

    pub async fn update(&self, id: i64, request: &UpdateResultRequest) -> Result<CompetitionResult, SportsHubError> {
        let result = sqlx::query(
            r#"
            UPDATE results
            SET round_type = COALESCE($2, round_type),
                score = COALESCE($3, score),
                rank = COALESCE($4, rank),
                award = COALESCE($5, award),
                score_unit = COALESCE($6, score_unit),
                remarks = COALESCE($7, remarks),
                certificate_url = COALESCE($8, certificate_url),
                is_published = COALESCE($9, is_published),
                updated_at = $10
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(request.round_type)
        .bind(request.score.as_deref().map(str::trim))
        .bind(request.rank)
        .bind(&request.award)
        .bind(&request.score_unit)
        .bind(&request.remarks)
        .bind(&request.certificate_url)
        .bind(request.is_published)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SportsHubError::not_found("Result", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, SportsHubError> {
        let result = sqlx::query("DELETE FROM results WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Publish or unpublish rows, limited to `events` when given; returns touched ids
    pub async fn set_published_many(
        &self,
        ids: &[i64],
        published: bool,
        events: Option<&[i64]>,
    ) -> Result<Vec<i64>, SportsHubError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            UPDATE results SET is_published = $2, updated_at = $4
            WHERE id = ANY($1) AND ($3::bigint[] IS NULL OR event_id = ANY($3))
            RETURNING id
            "#
        )
        .bind(ids)
        .bind(published)
        .bind(events)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Delete rows, limited to `events` when given; returns removed ids
    pub async fn delete_many(&self, ids: &[i64], events: Option<&[i64]>) -> Result<Vec<i64>, SportsHubError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            DELETE FROM results
            WHERE id = ANY($1) AND ($2::bigint[] IS NULL OR event_id = ANY($2))
            RETURNING id
            "#
        )
        .bind(ids)
        .bind(events)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// List results visible under `scope`
    pub async fn list(&self, filter: &ResultFilter, scope: &ResultScope) -> Result<Page<CompetitionResult>, SportsHubError> {
        let (limit, offset) = page_window(filter.page, filter.page_size);
        let search = search_pattern(filter.search.as_deref());
        let order = order_clause(filter.ordering.as_deref(), RESULT_ORDERING, "s.created_at DESC");

        let rows = sqlx::query_as::<_, CompetitionResult>(&format!(
            "{RESULT_SELECT} {RESULT_FILTER} ORDER BY {order} LIMIT $8 OFFSET $9"
        ))
        .bind(filter.event)
        .bind(filter.round_type)
        .bind(filter.is_published)
        .bind(filter.user)
        .bind(&search)
        .bind(scope.published_only())
        .bind(scope.referee_events())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(&format!(
            r#"SELECT COUNT(*) FROM results s
               JOIN events e ON e.id = s.event_id
               JOIN registrations r ON r.id = s.registration_id
               JOIN users u ON u.id = s.user_id
               {RESULT_FILTER}"#
        ))
        .bind(filter.event)
        .bind(filter.round_type)
        .bind(filter.is_published)
        .bind(filter.user)
        .bind(&search)
        .bind(scope.published_only())
        .bind(scope.referee_events())
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(rows, count.0, limit, offset))
    }

    /// Top ten published results of one round
    pub async fn leaderboard(&self, event_id: i64, round_type: RoundType) -> Result<Vec<CompetitionResult>, SportsHubError> {
        let rows = sqlx::query_as::<_, CompetitionResult>(&format!(
            r#"{RESULT_SELECT}
               WHERE s.event_id = $1 AND s.round_type = $2 AND s.is_published
               ORDER BY s.rank ASC NULLS LAST, s.id ASC
               LIMIT 10"#
        ))
        .bind(event_id)
        .bind(round_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Published results of an event ordered by rank
    pub async fn published_for_event(&self, event_id: i64) -> Result<Vec<CompetitionResult>, SportsHubError> {
        let rows = sqlx::query_as::<_, CompetitionResult>(&format!(
            r#"{RESULT_SELECT}
               WHERE s.event_id = $1 AND s.is_published
               ORDER BY s.rank ASC NULLS LAST, s.id ASC"#
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Results of one user, newest first
    pub async fn for_user(&self, user_id: i64, published_only: bool) -> Result<Vec<CompetitionResult>, SportsHubError> {
        let rows = sqlx::query_as::<_, CompetitionResult>(&format!(
            r#"{RESULT_SELECT}
               WHERE s.user_id = $1 AND (NOT $2 OR s.is_published)
               ORDER BY s.created_at DESC"#
        ))
        .bind(user_id)
        .bind(published_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Rows for a spreadsheet export: final, semifinal, preliminary, then rank and score
    pub async fn for_export(
        &self,
        event_id: i64,
        round_type: Option<RoundType>,
        scope: &ResultScope,
    ) -> Result<Vec<CompetitionResult>, SportsHubError> {
        let rows = sqlx::query_as::<_, CompetitionResult>(&format!(
            r#"{RESULT_SELECT}
               WHERE s.event_id = $1
                 AND ($2::text IS NULL OR s.round_type = $2)
                 AND (NOT $3::boolean OR s.is_published
                      OR ($4::bigint[] IS NOT NULL AND s.event_id = ANY($4)))
               ORDER BY {ROUND_ORDER}, s.rank ASC NULLS LAST, s.score ASC"#
        ))
        .bind(event_id)
        .bind(round_type)
        .bind(scope.published_only())
        .bind(scope.referee_events())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_write_access() {
        assert!(ResultScope::All.can_write(7));
        assert!(ResultScope::Referee(vec![7, 8]).can_write(7));
        assert!(!ResultScope::Referee(vec![8]).can_write(7));
        assert!(!ResultScope::Published.can_write(7));
    }

    #[test]
    fn test_scope_visibility_flags() {
        assert!(!ResultScope::All.published_only());
        assert!(ResultScope::Published.published_only());
        assert_eq!(ResultScope::Referee(vec![3]).referee_events(), Some(&[3][..]));
        assert_eq!(ResultScope::All.writable_events(), None);
    }
}
