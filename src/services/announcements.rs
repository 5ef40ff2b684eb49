//! Announcement service implementation

use chrono::{DateTime, Utc};
use crate::database::repositories::AnnouncementRepository;
use crate::models::Page;
use crate::models::announcement::{
    Announcement, AnnouncementFilter, CreateAnnouncementRequest, UpdateAnnouncementRequest,
};
use crate::services::auth::{AuthContext, Permission};
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::logging::log_admin_action;

#[derive(Debug, Clone)]
pub struct AnnouncementService {
    repository: AnnouncementRepository,
}

impl AnnouncementService {
    pub fn new(repository: AnnouncementRepository) -> Self {
        Self { repository }
    }

    /// Managers see everything; others only published, unexpired rows
    pub async fn list(&self, ctx: Option<&AuthContext>, filter: &AnnouncementFilter, now: DateTime<Utc>) -> Result<Page<Announcement>> {
        let visible_only = !ctx.is_some_and(AuthContext::is_manager);
        self.repository.list(filter, visible_only, now).await
    }

    /// Fetch one announcement and count the view
    pub async fn retrieve(&self, ctx: Option<&AuthContext>, id: i64, now: DateTime<Utc>) -> Result<Announcement> {
        let announcement = self.repository.get(id).await?;
        if !ctx.is_some_and(AuthContext::is_manager) && !announcement.is_visible(now) {
            return Err(SportsHubError::not_found("Announcement", id));
        }

        self.repository.increment_view(id).await?;
        Ok(Announcement {
            view_count: announcement.view_count + 1,
            ..announcement
        })
    }

    pub async fn published(&self, now: DateTime<Utc>) -> Result<Vec<Announcement>> {
        self.repository.visible(now, false, None).await
    }

    pub async fn pinned(&self, now: DateTime<Utc>) -> Result<Vec<Announcement>> {
        self.repository.visible(now, true, None).await
    }

    pub async fn create(&self, ctx: &AuthContext, request: &CreateAnnouncementRequest) -> Result<Announcement> {
        ctx.require(Permission::Manager)?;
        request.validate()?;

        let announcement = self.repository.create(request, ctx.user_id).await?;
        log_admin_action(ctx.user_id, "create_announcement", Some(&announcement.id.to_string()), None);
        Ok(announcement)
    }

    /// Update (author or admin)
    pub async fn update(&self, ctx: &AuthContext, id: i64, request: &UpdateAnnouncementRequest) -> Result<Announcement> {
        let current = self.repository.get(id).await?;
        ctx.require_owner_or_admin(current.author_id)?;

        if let (Some(publish), Some(expire)) = (
            request.publish_time.or(current.publish_time),
            request.expire_time.or(current.expire_time),
        ) {
            if expire < publish {
                return Err(SportsHubError::invalid("Expire time must not precede publish time"));
            }
        }

        let announcement = self.repository.update(id, request).await?;
        log_admin_action(ctx.user_id, "update_announcement", Some(&id.to_string()), None);
        Ok(announcement)
    }

    pub async fn delete(&self, ctx: &AuthContext, id: i64) -> Result<()> {
        let current = self.repository.get(id).await?;
        ctx.require_owner_or_admin(current.author_id)?;

        self.repository.delete(id).await?;
        log_admin_action(ctx.user_id, "delete_announcement", Some(&id.to_string()), None);
        Ok(())
    }

    pub async fn set_published(&self, ctx: &AuthContext, id: i64, published: bool) -> Result<Announcement> {
        ctx.require(Permission::Admin)?;
        let announcement = self.repository.set_published(id, published).await?;
        let action = if published { "publish_announcement" } else { "unpublish_announcement" };
        log_admin_action(ctx.user_id, action, Some(&id.to_string()), None);
        Ok(announcement)
    }

    pub async fn set_pinned(&self, ctx: &AuthContext, id: i64, pinned: bool) -> Result<Announcement> {
        ctx.require(Permission::Admin)?;
        let announcement = self.repository.set_pinned(id, pinned).await?;
        let action = if pinned { "pin_announcement" } else { "unpin_announcement" };
        log_admin_action(ctx.user_id, action, Some(&id.to_string()), None);
        Ok(announcement)
    }
}
