//! Competition result service
//!
//! Visibility and write access both derive from a [`ResultScope`]: managers
//! act on everything, referees on the events they were granted, everyone
//! else only reads published rows.

use std::collections::HashMap;
use tracing::{debug, info};
use crate::database::{DatabaseService, ResultScope};
use crate::models::Page;
use crate::models::event::Event;
use crate::models::registration::{BulkOutcome, Registration, RegistrationStatus};
use crate::models::result::{
    CompetitionResult, CreateResultRequest, ImportRowError, ImportSummary, ResultFilter, RoundType,
    UpdateResultRequest,
};
use crate::services::auth::{AuthContext, Permission};
use crate::services::spreadsheet::{self, ImportRow};
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::logging::log_event_action;

const DUPLICATE_RESULT: &str = "A result for this registration and round already exists";

#[derive(Debug, Clone)]
pub struct ResultService {
    db: DatabaseService,
}

impl ResultService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Scope of an optional caller; anonymous readers see published rows
    pub async fn scope(&self, ctx: Option<&AuthContext>) -> Result<ResultScope> {
        match ctx {
            Some(ctx) if ctx.is_manager() => Ok(ResultScope::All),
            Some(ctx) if ctx.is_referee() => Ok(ResultScope::Referee(
                self.db.assignments.accessible_event_ids(ctx.user_id).await?,
            )),
            _ => Ok(ResultScope::Published),
        }
    }

    async fn writable_scope(&self, ctx: &AuthContext) -> Result<ResultScope> {
        ctx.require(Permission::Reviewer)?;
        self.scope(Some(ctx)).await
    }

    fn require_event(scope: &ResultScope, event_id: i64) -> Result<()> {
        if scope.can_write(event_id) {
            return Ok(());
        }
        Err(SportsHubError::forbidden("Referee is not assigned to this event"))
    }

    pub async fn list(&self, ctx: Option<&AuthContext>, filter: &ResultFilter) -> Result<Page<CompetitionResult>> {
        let scope = self.scope(ctx).await?;
        self.db.results.list(filter, &scope).await
    }

    /// Fetch a result the caller may see; hidden rows read as missing
    pub async fn get_visible(&self, ctx: Option<&AuthContext>, id: i64) -> Result<CompetitionResult> {
        let result = self.db.results.get(id).await?;
        let visible = match self.scope(ctx).await? {
            ResultScope::All => true,
            ResultScope::Referee(events) => result.is_published || events.contains(&result.event_id),
            ResultScope::Published => result.is_published,
        };
        if !visible {
            return Err(SportsHubError::not_found("Result", id));
        }
        Ok(result)
    }

    /// Record a result for an approved registration of the event
    pub async fn create(&self, ctx: &AuthContext, request: &CreateResultRequest) -> Result<CompetitionResult> {
        let scope = self.writable_scope(ctx).await?;
        Self::require_event(&scope, request.event)?;
        request.validate()?;

        let registration = self.db.registrations.get(request.registration).await?;
        check_registration(&registration, request.event)?;

        let mut tx = self.db.begin().await?;
        if self
            .db
            .results
            .exists_for(&mut tx, request.event, request.registration, request.round_type)
            .await?
        {
            return Err(SportsHubError::Conflict(DUPLICATE_RESULT.to_string()));
        }
        let id = self
            .db
            .results
            .insert(&mut tx, request, registration.user_id, ctx.user_id)
            .await
            .map_err(|e| e.unique_as_conflict(DUPLICATE_RESULT))?;
        tx.commit().await?;

        log_event_action(request.event, "record_result", ctx.user_id, Some(&id.to_string()));
        self.db.results.get(id).await
    }

    async fn writable(&self, ctx: &AuthContext, id: i64) -> Result<CompetitionResult> {
        let scope = self.writable_scope(ctx).await?;
        let result = self.db.results.get(id).await?;
        Self::require_event(&scope, result.event_id)?;
        Ok(result)
    }

    pub async fn update(&self, ctx: &AuthContext, id: i64, request: &UpdateResultRequest) -> Result<CompetitionResult> {
        request.validate()?;
        let current = self.writable(ctx, id).await?;

        let updated = self
            .db
            .results
            .update(id, request)
            .await
            .map_err(|e| e.unique_as_conflict(DUPLICATE_RESULT))?;
        log_event_action(current.event_id, "update_result", ctx.user_id, Some(&id.to_string()));
        Ok(updated)
    }

    pub async fn delete(&self, ctx: &AuthContext, id: i64) -> Result<()> {
        let current = self.writable(ctx, id).await?;
        self.db.results.delete(id).await?;
        log_event_action(current.event_id, "delete_result", ctx.user_id, Some(&id.to_string()));
        Ok(())
    }

    pub async fn set_published(&self, ctx: &AuthContext, id: i64, published: bool) -> Result<CompetitionResult> {
        let current = self.writable(ctx, id).await?;
        let request = UpdateResultRequest {
            is_published: Some(published),
            ..Default::default()
        };
        let updated = self.db.results.update(id, &request).await?;

        let action = if published { "publish_result" } else { "unpublish_result" };
        log_event_action(current.event_id, action, ctx.user_id, Some(&id.to_string()));
        Ok(updated)
    }

    pub async fn bulk_publish(&self, ctx: &AuthContext, ids: &[i64]) -> Result<BulkOutcome> {
        let scope = self.writable_scope(ctx).await?;
        require_ids(ids)?;

        let touched = self.db.results.set_published_many(ids, true, scope.writable_events()).await?;
        if touched.is_empty() {
            return Err(SportsHubError::invalid("No result to publish was found"));
        }
        info!(actor_id = ctx.user_id, ids = ?touched, "Bulk result publish");
        Ok(BulkOutcome { affected: touched.len(), ids: touched })
    }

    pub async fn bulk_delete(&self, ctx: &AuthContext, ids: &[i64]) -> Result<BulkOutcome> {
        let scope = self.writable_scope(ctx).await?;
        require_ids(ids)?;

        let removed = self.db.results.delete_many(ids, scope.writable_events()).await?;
        if removed.is_empty() {
            return Err(SportsHubError::invalid("No result to delete was found"));
        }
        info!(actor_id = ctx.user_id, ids = ?removed, "Bulk result delete");
        Ok(BulkOutcome { affected: removed.len(), ids: removed })
    }

    pub async fn leaderboard(&self, event_id: i64, round_type: RoundType) -> Result<Vec<CompetitionResult>> {
        self.db.events.get(event_id).await?;
        self.db.results.leaderboard(event_id, round_type).await
    }

    /// The caller's own published results
    pub async fn my_results(&self, ctx: &AuthContext) -> Result<Vec<CompetitionResult>> {
        self.db.results.for_user(ctx.user_id, true).await
    }

    /// A user's results (self or admin); admins also see unpublished rows
    pub async fn for_user(&self, ctx: &AuthContext, user_id: i64) -> Result<Vec<CompetitionResult>> {
        ctx.require_owner_or_admin(user_id)?;
        self.db.results.for_user(user_id, !ctx.is_admin()).await
    }

    /// Approved registrations still waiting for any result
    pub async fn pending_results_count(&self, ctx: &AuthContext) -> Result<i64> {
        match self.writable_scope(ctx).await? {
            ResultScope::All => self.db.registrations.count_without_result(None).await,
            ResultScope::Referee(events) if !events.is_empty() => {
                self.db.registrations.count_without_result(Some(&events)).await
            }
            _ => Ok(0),
        }
    }

    /// Build an `.xlsx` of an event's results visible to the caller
    pub async fn export(&self, ctx: &AuthContext, event_id: i64, round_type: Option<RoundType>) -> Result<Vec<u8>> {
        let scope = self.writable_scope(ctx).await?;
        self.db.events.get(event_id).await?;

        let rows = self.db.results.for_export(event_id, round_type, &scope).await?;
        debug!(event_id, rows = rows.len(), "Exporting results");
        spreadsheet::results_sheet(&rows).to_xlsx()
    }

    /// Import results from an uploaded workbook in one transaction
    pub async fn import(&self, ctx: &AuthContext, bytes: Vec<u8>, context_event: Option<i64>) -> Result<ImportSummary> {
        let scope = self.writable_scope(ctx).await?;
        let (headers, data) = spreadsheet::read_xlsx(bytes)?;
        let rows = spreadsheet::import_rows(&headers, data)?;

        let mut events: HashMap<String, Option<Event>> = HashMap::new();
        let mut approved: HashMap<i64, Vec<Registration>> = HashMap::new();
        let mut errors = Vec::new();
        let mut imported = 0;

        let mut tx = self.db.begin().await?;
        for row in &rows {
            let request = match self
                .prepare_row(row, &scope, context_event, &mut events, &mut approved)
                .await?
            {
                Ok(request) => request,
                Err(detail) => {
                    errors.push(ImportRowError { row: row.row, detail });
                    continue;
                }
            };

            if self
                .db
                .results
                .exists_for(&mut tx, request.event, request.registration, request.round_type)
                .await?
            {
                errors.push(ImportRowError {
                    row: row.row,
                    detail: "Participant already has a result for this round".to_string(),
                });
                continue;
            }

            let user_id = approved
                .get(&request.event)
                .and_then(|list| list.iter().find(|r| r.id == request.registration))
                .map(|r| r.user_id)
                .ok_or_else(|| SportsHubError::not_found("Registration", request.registration))?;
            self.db.results.insert(&mut tx, &request, user_id, ctx.user_id).await?;
            imported += 1;
        }

        if imported == 0 {
            tx.rollback().await?;
        } else {
            tx.commit().await?;
        }

        info!(actor_id = ctx.user_id, imported, failed = errors.len(), "Result import finished");
        Ok(ImportSummary { imported, errors })
    }

    /// Resolve one sheet row; the inner error is the row's failure detail
    async fn prepare_row(
        &self,
        row: &ImportRow,
        scope: &ResultScope,
        context_event: Option<i64>,
        events: &mut HashMap<String, Option<Event>>,
        approved: &mut HashMap<i64, Vec<Registration>>,
    ) -> Result<std::result::Result<CreateResultRequest, String>> {
        if row.event.is_empty() {
            return Ok(Err("Event name is empty".to_string()));
        }

        let key = row.event.to_lowercase();
        if !events.contains_key(&key) {
            let found = self.db.events.find_by_title(&row.event).await?.into_iter().next();
            events.insert(key.clone(), found);
        }
        let Some(event) = events.get(&key).and_then(|e| e.as_ref()) else {
            return Ok(Err(format!("Event not found: {}", row.event)));
        };
        if context_event.is_some_and(|id| id != event.id) {
            return Ok(Err(format!("Row event does not match the selected event ({})", event.title)));
        }
        if !scope.can_write(event.id) {
            return Ok(Err(format!("Referee is not assigned to event {}", event.title)));
        }

        let candidates = spreadsheet::candidate_names(&row.participant);
        if candidates.is_empty() {
            return Ok(Err("Participant is empty".to_string()));
        }
        if !approved.contains_key(&event.id) {
            let list = self
                .db
                .registrations
                .for_event(event.id, Some(RegistrationStatus::Approved))
                .await?;
            approved.insert(event.id, list);
        }
        let registrations = approved.get(&event.id).map(Vec::as_slice).unwrap_or(&[]);
        let registration = match spreadsheet::match_registration(registrations, &candidates) {
            Ok(registration) => registration,
            Err(detail) => return Ok(Err(detail)),
        };

        let Some(round_type) = spreadsheet::normalize_round(&row.round) else {
            return Ok(Err("Round is not recognised".to_string()));
        };
        if row.score.is_empty() {
            return Ok(Err("Score is empty".to_string()));
        }
        let Ok(rank) = spreadsheet::parse_rank(&row.rank) else {
            return Ok(Err("Rank must be a number".to_string()));
        };

        let request = CreateResultRequest {
            event: event.id,
            registration: registration.id,
            round_type,
            score: row.score.clone(),
            rank,
            award: String::new(),
            score_unit: String::new(),
            remarks: String::new(),
            certificate_url: String::new(),
            is_published: false,
        };
        if let Err(e) = request.validate() {
            return Ok(Err(e.to_string()));
        }
        Ok(Ok(request))
    }
}

/// A result may only reference an approved registration of the same event
fn check_registration(registration: &Registration, event_id: i64) -> Result<()> {
    if registration.event_id != event_id {
        return Err(SportsHubError::invalid("Registration does not belong to this event"));
    }
    if registration.status != RegistrationStatus::Approved {
        return Err(SportsHubError::invalid("Registration has not been approved"));
    }
    Ok(())
}

fn require_ids(ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Err(SportsHubError::invalid("ids must contain at least one id"));
    }
    Ok(())
}

/// HTTP status for an import outcome: nothing imported is a bad request,
/// a clean import is created, a partial one is ok
pub fn import_status(summary: &ImportSummary) -> axum::http::StatusCode {
    use axum::http::StatusCode;
    if summary.imported == 0 {
        StatusCode::BAD_REQUEST
    } else if summary.errors.is_empty() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn summary(imported: usize, errors: usize) -> ImportSummary {
        ImportSummary {
            imported,
            errors: (0..errors)
                .map(|i| ImportRowError { row: i + 2, detail: "bad".into() })
                .collect(),
        }
    }

    #[test]
    fn test_import_status_codes() {
        assert_eq!(import_status(&summary(0, 3)), StatusCode::BAD_REQUEST);
        assert_eq!(import_status(&summary(4, 0)), StatusCode::CREATED);
        assert_eq!(import_status(&summary(4, 1)), StatusCode::OK);
    }

    #[test]
    fn test_writes_limited_to_scope() {
        assert!(ResultService::require_event(&ResultScope::Referee(vec![1]), 1).is_ok());
        assert!(ResultService::require_event(&ResultScope::Referee(vec![1]), 2).is_err());
        assert!(ResultService::require_event(&ResultScope::All, 2).is_ok());
    }
}
