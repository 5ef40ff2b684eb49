//! Event service implementation
//!
//! This service covers event CRUD and the listing shortcuts, cover image
//! uploads, referee round assignments and referee event access.

use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use crate::config::UploadsConfig;
use crate::database::DatabaseService;
use crate::models::{Page, UserType};
use crate::models::announcement::Announcement;
use crate::models::event::{
    AssignRefereeEventsRequest, AssignmentFilter, CreateAssignmentRequest, CreateEventRequest, EventAssignment,
    EventDetail, EventFilter, EventView, RefereeEventAccess, UpdateAssignmentRequest, UpdateEventRequest,
};
use crate::models::registration::Registration;
use crate::models::result::CompetitionResult;
use crate::services::auth::{AuthContext, Permission};
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::helpers::generate_random_string;
use crate::utils::logging::{log_admin_action, log_event_action};

/// Returned after a successful cover upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Clone)]
pub struct EventService {
    db: DatabaseService,
    uploads: UploadsConfig,
}

impl EventService {
    pub fn new(db: DatabaseService, uploads: UploadsConfig) -> Self {
        Self { db, uploads }
    }

    pub async fn list(&self, filter: &EventFilter, now: DateTime<Utc>) -> Result<Page<EventView>> {
        let page = self.db.events.list(filter, now).await?;
        Ok(page.map(|event| EventView::new(event, now)))
    }

    pub async fn detail(&self, id: i64, now: DateTime<Utc>) -> Result<EventDetail> {
        self.db.event_detail(id, now).await
    }

    /// Create an event; the caller becomes its organizer
    pub async fn create(&self, ctx: &AuthContext, request: &CreateEventRequest, now: DateTime<Utc>) -> Result<EventView> {
        ctx.require(Permission::Manager)?;
        request.validate()?;

        let event = self.db.events.create(request, ctx.user_id).await?;
        log_event_action(event.id, "create", ctx.user_id, Some(&event.title));
        Ok(EventView::new(event, now))
    }

    /// Update an event (organizer or admin)
    pub async fn update(&self, ctx: &AuthContext, id: i64, request: &UpdateEventRequest, now: DateTime<Utc>) -> Result<EventView> {
        let current = self.db.events.get(id).await?;
        ctx.require_owner_or_admin(current.organizer_id)?;
        request.validate_against(&current)?;

        let event = self.db.events.update(id, request).await?;
        log_event_action(id, "update", ctx.user_id, None);
        Ok(EventView::new(event, now))
    }

    pub async fn delete(&self, ctx: &AuthContext, id: i64) -> Result<()> {
        let current = self.db.events.get(id).await?;
        ctx.require_owner_or_admin(current.organizer_id)?;

        self.db.events.delete(id).await?;
        log_event_action(id, "delete", ctx.user_id, Some(&current.title));
        Ok(())
    }

    pub async fn click(&self, id: i64) -> Result<i32> {
        self.db.events.increment_view(id).await
    }

    pub async fn featured(&self, now: DateTime<Utc>) -> Result<Vec<EventView>> {
        Ok(views(self.db.events.featured().await?, now))
    }

    pub async fn upcoming(&self, now: DateTime<Utc>) -> Result<Vec<EventView>> {
        Ok(views(self.db.events.upcoming(now, 10).await?, now))
    }

    pub async fn ongoing(&self, now: DateTime<Utc>) -> Result<Vec<EventView>> {
        Ok(views(self.db.events.ongoing(now).await?, now))
    }

    pub async fn open_for_registration(&self, now: DateTime<Utc>) -> Result<Vec<EventView>> {
        Ok(views(self.db.events.open_for_registration(now).await?, now))
    }

    /// Every registration of an event (reviewers)
    pub async fn registrations(&self, ctx: &AuthContext, id: i64) -> Result<Vec<Registration>> {
        ctx.require(Permission::Reviewer)?;
        self.db.events.get(id).await?;
        self.db.registrations.for_event(id, None).await
    }

    pub async fn results(&self, id: i64) -> Result<Vec<CompetitionResult>> {
        self.db.events.get(id).await?;
        self.db.results.published_for_event(id).await
    }

    pub async fn announcements(&self, id: i64, now: DateTime<Utc>) -> Result<Vec<Announcement>> {
        self.db.events.get(id).await?;
        self.db.announcements.visible(now, false, Some(id)).await
    }

    /// Store an event cover image under `uploads.dir/events/`
    pub async fn upload_image(
        &self,
        ctx: &AuthContext,
        content_type: Option<&str>,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<UploadedImage> {
        ctx.require(Permission::Manager)?;

        let extension = content_type
            .and_then(image_extension)
            .ok_or_else(|| SportsHubError::invalid("Only jpg, png, gif and webp images are accepted"))?;
        if bytes.len() > self.uploads.max_image_bytes {
            return Err(SportsHubError::invalid(format!(
                "Image cannot exceed {} bytes",
                self.uploads.max_image_bytes
            )));
        }
        if bytes.is_empty() {
            return Err(SportsHubError::invalid("Uploaded file is empty"));
        }

        let directory = Path::new(&self.uploads.dir).join("events");
        tokio::fs::create_dir_all(&directory).await?;
        let filename = upload_filename(now, extension);
        let path: PathBuf = directory.join(&filename);
        tokio::fs::write(&path, bytes).await?;

        debug!(path = %path.display(), size = bytes.len(), "Stored event image");
        Ok(UploadedImage {
            url: format!("{}/events/{}", self.uploads.public_prefix.trim_end_matches('/'), filename),
            filename,
        })
    }

    // Referee assignments

    /// Reviewers list assignments; referees only see their own
    pub async fn list_assignments(&self, ctx: &AuthContext, filter: &AssignmentFilter) -> Result<Vec<EventAssignment>> {
        ctx.require(Permission::Reviewer)?;
        let only_referee = if ctx.is_manager() { None } else { Some(ctx.user_id) };
        self.db.assignments.list(filter, only_referee).await
    }

    pub async fn get_assignment(&self, ctx: &AuthContext, id: i64) -> Result<EventAssignment> {
        ctx.require(Permission::Reviewer)?;
        let assignment = self.db.assignments.get(id).await?;
        if !ctx.is_manager() && assignment.referee_id != ctx.user_id {
            return Err(SportsHubError::not_found("Assignment", id));
        }
        Ok(assignment)
    }

    pub async fn create_assignment(&self, ctx: &AuthContext, request: &CreateAssignmentRequest) -> Result<EventAssignment> {
        ctx.require(Permission::Admin)?;
        self.db.events.get(request.event_id).await?;
        self.require_referee(request.referee_id).await?;

        let assignment = self.db.assignments.create(request, ctx.user_id).await?;
        log_admin_action(ctx.user_id, "assign_referee", Some(&assignment.id.to_string()), None);
        Ok(assignment)
    }

    pub async fn update_assignment(&self, ctx: &AuthContext, id: i64, request: &UpdateAssignmentRequest) -> Result<EventAssignment> {
        ctx.require(Permission::Admin)?;
        if let Some(referee_id) = request.referee_id {
            self.require_referee(referee_id).await?;
        }
        let assignment = self.db.assignments.update(id, request).await?;
        log_admin_action(ctx.user_id, "update_assignment", Some(&id.to_string()), None);
        Ok(assignment)
    }

    pub async fn delete_assignment(&self, ctx: &AuthContext, id: i64) -> Result<()> {
        ctx.require(Permission::Admin)?;
        if !self.db.assignments.delete(id).await? {
            return Err(SportsHubError::not_found("Assignment", id));
        }
        log_admin_action(ctx.user_id, "delete_assignment", Some(&id.to_string()), None);
        Ok(())
    }

    async fn require_referee(&self, user_id: i64) -> Result<()> {
        let user = self
            .db
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| SportsHubError::not_found("User", user_id))?;
        if user.user_type != UserType::Referee {
            return Err(SportsHubError::invalid(format!("User {} is not a referee", user.username)));
        }
        Ok(())
    }

    // Referee event access

    pub async fn list_access(&self, ctx: &AuthContext, referee: Option<i64>) -> Result<Vec<RefereeEventAccess>> {
        ctx.require(Permission::Admin)?;
        self.db.assignments.list_access(referee).await
    }

    /// Replace a referee's accessible events in one transaction
    pub async fn assign_access(&self, ctx: &AuthContext, request: &AssignRefereeEventsRequest) -> Result<Vec<RefereeEventAccess>> {
        ctx.require(Permission::Admin)?;
        self.require_referee(request.referee).await?;

        let mut event_ids = request.event_ids.clone();
        event_ids.sort_unstable();
        event_ids.dedup();
        for event_id in &event_ids {
            if !self.db.events.exists(*event_id).await? {
                return Err(SportsHubError::not_found("Event", *event_id));
            }
        }

        let access = self.db.assignments.replace_access(request.referee, &event_ids).await?;
        info!(admin_id = ctx.user_id, referee_id = request.referee, events = ?event_ids, "Referee event access replaced");
        Ok(access)
    }

    /// Events the caller may record results for; empty for non-referees
    pub async fn my_events(&self, ctx: &AuthContext, now: DateTime<Utc>) -> Result<Vec<EventView>> {
        if !ctx.is_referee() {
            return Ok(Vec::new());
        }
        Ok(views(self.db.events.for_referee(ctx.user_id).await?, now))
    }
}

fn views(events: Vec<crate::models::Event>, now: DateTime<Utc>) -> Vec<EventView> {
    events.into_iter().map(|event| EventView::new(event, now)).collect()
}

/// File extension for an accepted image content type
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// `event_{YYYYMMDDHHMMSS}_{8 random chars}.{ext}`
pub fn upload_filename(now: DateTime<Utc>, extension: &str) -> String {
    format!(
        "event_{}_{}.{}",
        now.format("%Y%m%d%H%M%S"),
        generate_random_string(8),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::database::connection::DatabaseConfig;
    use crate::database::create_lazy_pool;

    fn service(dir: &Path) -> EventService {
        let config = DatabaseConfig {
            url: "postgresql://nobody@127.0.0.1:1/none".to_string(),
            ..DatabaseConfig::default()
        };
        let mut uploads = Settings::default().uploads;
        uploads.dir = dir.display().to_string();
        uploads.max_image_bytes = 16;
        EventService::new(DatabaseService::new(create_lazy_pool(&config).unwrap()), uploads)
    }

    fn organizer() -> AuthContext {
        AuthContext {
            user_id: 3,
            username: "organizer".into(),
            user_type: UserType::Organizer,
            is_superuser: false,
        }
    }

    #[test]
    fn test_image_extensions() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("IMAGE/PNG"), Some("png"));
        assert_eq!(image_extension("image/svg+xml"), None);
        assert_eq!(image_extension("application/pdf"), None);
    }

    #[test]
    fn test_upload_filename_shape() {
        let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 5, 1, 8, 30, 0).unwrap();
        let name = upload_filename(now, "png");
        assert!(name.starts_with("event_20240501083000_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "event_20240501083000_".len() + 8 + 4);
    }

    #[tokio::test]
    async fn test_upload_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let uploaded = service
            .upload_image(&organizer(), Some("image/png"), b"\x89PNG....", Utc::now())
            .await
            .unwrap();
        assert!(uploaded.url.ends_with(&uploaded.filename));
        assert!(dir.path().join("events").join(&uploaded.filename).exists());
    }

    #[tokio::test]
    async fn test_upload_rejects_large_or_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let too_big = service
            .upload_image(&organizer(), Some("image/png"), &[0u8; 32], Utc::now())
            .await;
        assert!(too_big.is_err());

        let wrong_type = service
            .upload_image(&organizer(), Some("text/plain"), b"hi", Utc::now())
            .await;
        assert!(wrong_type.is_err());
    }

    #[tokio::test]
    async fn test_upload_requires_manager() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let athlete = AuthContext { user_type: UserType::Athlete, ..organizer() };

        let err = service
            .upload_image(&athlete, Some("image/png"), b"x", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.status_and_code().0, axum::http::StatusCode::FORBIDDEN);
    }
}
