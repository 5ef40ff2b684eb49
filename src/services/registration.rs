//! Registration workflow
//!
//! Every status change runs in one transaction with the event row locked so
//! the event's participant counter moves together with the registration.
//! Locks are always taken event first, then registration.

use std::collections::BTreeSet;
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use crate::database::DatabaseService;
use crate::models::Page;
use crate::models::registration::{
    BulkOutcome, CreateRegistrationRequest, ParticipantDetails, Registration, RegistrationFilter,
    RegistrationStatus,
};
use crate::services::auth::{AuthContext, Permission};
use crate::services::spreadsheet;
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::helpers::generate_registration_number;
use crate::utils::logging::log_registration_action;

#[derive(Debug, Clone)]
pub struct RegistrationService {
    db: DatabaseService,
}

impl RegistrationService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Register the caller for an event
    pub async fn create(&self, ctx: &AuthContext, request: &CreateRegistrationRequest, now: DateTime<Utc>) -> Result<Registration> {
        request.details.validate()?;

        let mut tx = self.db.begin().await?;
        let event = self.db.events.lock_for_update(&mut tx, request.event).await?;

        if self.db.registrations.exists_for(&mut tx, event.id, ctx.user_id).await? {
            return Err(SportsHubError::Conflict("Already registered for this event".to_string()));
        }
        if !event.status.accepts_registrations() {
            return Err(SportsHubError::invalid("Event is not open for registration"));
        }
        if !event.in_registration_window(now) {
            return Err(SportsHubError::invalid("Registration window is closed"));
        }
        if event.is_full() {
            return Err(SportsHubError::invalid("Event is full"));
        }

        let number = generate_registration_number(event.id, now);
        let id = self
            .db
            .registrations
            .insert(&mut tx, &event, ctx.user_id, &number, &request.details)
            .await?;
        self.db.events.adjust_participants(&mut tx, event.id, 1).await?;
        tx.commit().await?;

        log_registration_action(id, "create", ctx.user_id, Some(&number));
        self.db.registrations.get(id).await
    }

    /// Fetch a registration the caller may see; others' rows read as missing
    pub async fn get_visible(&self, ctx: &AuthContext, id: i64) -> Result<Registration> {
        let registration = self.db.registrations.get(id).await?;
        if ctx.is_manager() || registration.user_id == ctx.user_id {
            return Ok(registration);
        }
        Err(SportsHubError::not_found("Registration", id))
    }

    pub async fn list(&self, ctx: &AuthContext, filter: &RegistrationFilter) -> Result<Page<Registration>> {
        let only_user = if ctx.is_manager() { None } else { Some(ctx.user_id) };
        self.db.registrations.list(filter, only_user).await
    }

    pub async fn mine(&self, ctx: &AuthContext) -> Result<Vec<Registration>> {
        self.db.registrations.for_user(ctx.user_id).await
    }

    /// A user's registrations (self or admin)
    pub async fn for_user(&self, ctx: &AuthContext, user_id: i64) -> Result<Vec<Registration>> {
        ctx.require_owner_or_admin(user_id)?;
        self.db.registrations.for_user(user_id).await
    }

    /// Update participant details (owner or admin)
    pub async fn update_details(&self, ctx: &AuthContext, id: i64, details: &ParticipantDetails) -> Result<Registration> {
        details.validate()?;
        let registration = self.get_visible(ctx, id).await?;
        ctx.require_owner_or_admin(registration.user_id)?;

        let updated = self.db.registrations.update_details(id, details).await?;
        log_registration_action(id, "update", ctx.user_id, None);
        Ok(updated)
    }

    /// Move a registration along the state machine, keeping the counter in step
    async fn transition(
        &self,
        id: i64,
        next: RegistrationStatus,
        required_from: Option<RegistrationStatus>,
        reviewer: Option<i64>,
        review_remarks: Option<&str>,
    ) -> Result<Registration> {
        let event_id = self.db.registrations.get(id).await?.event_id;

        let mut tx = self.db.begin().await?;
        self.db.events.lock_for_update(&mut tx, event_id).await?;
        let registration = self.db.registrations.lock(&mut tx, id).await?;

        if let Some(required) = required_from {
            if registration.status != required {
                return Err(SportsHubError::InvalidStateTransition {
                    from: registration.status.as_str().to_string(),
                    to: next.as_str().to_string(),
                });
            }
        }
        let delta = registration.status.transition(next)?;

        self.db
            .registrations
            .set_status(&mut tx, id, next, reviewer, review_remarks)
            .await?;
        self.db.events.adjust_participants(&mut tx, event_id, delta).await?;
        tx.commit().await?;

        debug!(registration_id = id, from = registration.status.as_str(), to = next.as_str(), delta, "Registration transitioned");
        self.db.registrations.get(id).await
    }

    pub async fn approve(&self, ctx: &AuthContext, id: i64, remarks: Option<&str>) -> Result<Registration> {
        ctx.require(Permission::Reviewer)?;
        let registration = self
            .transition(id, RegistrationStatus::Approved, Some(RegistrationStatus::Pending), Some(ctx.user_id), remarks)
            .await?;
        log_registration_action(id, "approve", ctx.user_id, remarks);
        Ok(registration)
    }

    pub async fn reject(&self, ctx: &AuthContext, id: i64, remarks: Option<&str>) -> Result<Registration> {
        ctx.require(Permission::Reviewer)?;
        let registration = self
            .transition(id, RegistrationStatus::Rejected, Some(RegistrationStatus::Pending), Some(ctx.user_id), remarks)
            .await?;
        log_registration_action(id, "reject", ctx.user_id, remarks);
        Ok(registration)
    }

    /// Cancel (owner or superuser)
    pub async fn cancel(&self, ctx: &AuthContext, id: i64) -> Result<Registration> {
        let current = self.get_visible(ctx, id).await?;
        if current.user_id != ctx.user_id && !ctx.is_superuser {
            return Err(SportsHubError::forbidden("Only the registrant may cancel this registration"));
        }

        let registration = self
            .transition(id, RegistrationStatus::Cancelled, None, None, None)
            .await?;
        log_registration_action(id, "cancel", ctx.user_id, None);
        Ok(registration)
    }

    /// Delete (owner or admin); a counted registration frees its seat
    pub async fn delete(&self, ctx: &AuthContext, id: i64) -> Result<()> {
        let current = self.get_visible(ctx, id).await?;
        ctx.require_owner_or_admin(current.user_id)?;

        let mut tx = self.db.begin().await?;
        self.db.events.lock_for_update(&mut tx, current.event_id).await?;
        let registration = self.db.registrations.lock(&mut tx, id).await?;
        if registration.status.is_counted() {
            self.db.events.adjust_participants(&mut tx, registration.event_id, -1).await?;
        }
        self.db.registrations.delete(&mut tx, id).await?;
        tx.commit().await?;

        log_registration_action(id, "delete", ctx.user_id, None);
        Ok(())
    }

    /// Lock the events of `ids` in ascending order, then the qualifying rows
    async fn lock_bulk(
        &self,
        tx: &mut sqlx::PgConnection,
        ids: &[i64],
        statuses: &[RegistrationStatus],
        only_user: Option<i64>,
    ) -> Result<Vec<Registration>> {
        let mut event_ids = BTreeSet::new();
        for id in ids {
            if let Some(registration) = self.db.registrations.find_by_id(*id).await? {
                event_ids.insert(registration.event_id);
            }
        }
        for event_id in &event_ids {
            self.db.events.lock_for_update(tx, *event_id).await?;
        }
        self.db.registrations.lock_many(tx, ids, statuses, only_user).await
    }

    /// Approve or reject many registrations at once
    pub async fn bulk_review(&self, ctx: &AuthContext, ids: &[i64], approve: bool, remarks: Option<&str>) -> Result<BulkOutcome> {
        ctx.require(Permission::Reviewer)?;
        require_ids(ids)?;

        let (next, eligible) = if approve {
            (RegistrationStatus::Approved, &[RegistrationStatus::Pending][..])
        } else {
            (RegistrationStatus::Rejected, &[RegistrationStatus::Pending, RegistrationStatus::Approved][..])
        };

        let mut tx = self.db.begin().await?;
        let rows = self.lock_bulk(&mut tx, ids, eligible, None).await?;
        if rows.is_empty() {
            return Err(SportsHubError::invalid("No registration awaiting review was found"));
        }

        let mut affected = Vec::with_capacity(rows.len());
        for registration in &rows {
            let delta = registration.status.transition(next)?;
            self.db
                .registrations
                .set_status(&mut tx, registration.id, next, Some(ctx.user_id), remarks)
                .await?;
            self.db.events.adjust_participants(&mut tx, registration.event_id, delta).await?;
            affected.push(registration.id);
        }
        tx.commit().await?;

        let action = if approve { "bulk_approve" } else { "bulk_reject" };
        info!(action, actor_id = ctx.user_id, ids = ?affected, "Bulk registration review");
        Ok(BulkOutcome { affected: affected.len(), ids: affected })
    }

    /// Build an `.xlsx` of an event's registrations
    pub async fn export(&self, ctx: &AuthContext, event_id: i64, status: Option<RegistrationStatus>) -> Result<Vec<u8>> {
        ctx.require(Permission::Reviewer)?;
        self.db.events.get(event_id).await?;

        let rows = self.db.registrations.for_event(event_id, status).await?;
        debug!(event_id, rows = rows.len(), "Exporting registrations");
        spreadsheet::registrations_sheet(&rows).to_xlsx()
    }

    /// Delete many registrations, freeing seats of counted ones
    pub async fn bulk_delete(&self, ctx: &AuthContext, ids: &[i64]) -> Result<BulkOutcome> {
        ctx.require(Permission::Reviewer)?;
        require_ids(ids)?;

        let all = [
            RegistrationStatus::Pending,
            RegistrationStatus::Approved,
            RegistrationStatus::Rejected,
            RegistrationStatus::Cancelled,
        ];
        let only_user = if ctx.is_manager() { None } else { Some(ctx.user_id) };

        let mut tx = self.db.begin().await?;
        let rows = self.lock_bulk(&mut tx, ids, &all, only_user).await?;
        if rows.is_empty() {
            return Err(SportsHubError::invalid("No registration to delete was found"));
        }

        let mut affected = Vec::with_capacity(rows.len());
        for registration in &rows {
            if registration.status.is_counted() {
                self.db.events.adjust_participants(&mut tx, registration.event_id, -1).await?;
            }
            self.db.registrations.delete(&mut tx, registration.id).await?;
            affected.push(registration.id);
        }
        tx.commit().await?;

        info!(actor_id = ctx.user_id, ids = ?affected, "Bulk registration delete");
        Ok(BulkOutcome { affected: affected.len(), ids: affected })
    }
}

fn require_ids(ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Err(SportsHubError::invalid("ids must contain at least one id"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bulk_rejected() {
        assert!(require_ids(&[]).is_err());
        assert!(require_ids(&[1]).is_ok());
    }
}
