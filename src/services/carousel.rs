//! Carousel slide service implementation

use chrono::{DateTime, Utc};
use crate::database::repositories::CarouselRepository;
use crate::models::Page;
use crate::models::carousel::{Carousel, CarouselFilter, CarouselPosition, CreateCarouselRequest, UpdateCarouselRequest};
use crate::services::auth::{AuthContext, Permission};
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::logging::log_admin_action;

#[derive(Debug, Clone)]
pub struct CarouselService {
    repository: CarouselRepository,
}

impl CarouselService {
    pub fn new(repository: CarouselRepository) -> Self {
        Self { repository }
    }

    /// Admins see every slide; others only live ones
    pub async fn list(&self, ctx: Option<&AuthContext>, filter: &CarouselFilter, now: DateTime<Utc>) -> Result<Page<Carousel>> {
        let live_only = !ctx.is_some_and(AuthContext::is_admin);
        self.repository.list(filter, live_only, now).await
    }

    pub async fn retrieve(&self, ctx: Option<&AuthContext>, id: i64, now: DateTime<Utc>) -> Result<Carousel> {
        let carousel = self.repository.get(id).await?;
        if !ctx.is_some_and(AuthContext::is_admin) && !carousel.is_live(now) {
            return Err(SportsHubError::not_found("Carousel", id));
        }
        Ok(carousel)
    }

    pub async fn live(&self, position: Option<CarouselPosition>, now: DateTime<Utc>) -> Result<Vec<Carousel>> {
        self.repository.live(position, now).await
    }

    pub async fn create(&self, ctx: &AuthContext, request: &CreateCarouselRequest) -> Result<Carousel> {
        ctx.require(Permission::Manager)?;
        request.validate()?;

        let carousel = self.repository.create(request, ctx.user_id).await?;
        log_admin_action(ctx.user_id, "create_carousel", Some(&carousel.id.to_string()), None);
        Ok(carousel)
    }

    /// Update (creator or admin)
    pub async fn update(&self, ctx: &AuthContext, id: i64, request: &UpdateCarouselRequest) -> Result<Carousel> {
        let current = self.repository.get(id).await?;
        ctx.require_owner_or_admin(current.creator_id)?;
        request.validate_against(&current)?;

        let carousel = self.repository.update(id, request).await?;
        log_admin_action(ctx.user_id, "update_carousel", Some(&id.to_string()), None);
        Ok(carousel)
    }

    pub async fn delete(&self, ctx: &AuthContext, id: i64) -> Result<()> {
        let current = self.repository.get(id).await?;
        ctx.require_owner_or_admin(current.creator_id)?;

        self.repository.delete(id).await?;
        log_admin_action(ctx.user_id, "delete_carousel", Some(&id.to_string()), None);
        Ok(())
    }

    pub async fn click(&self, id: i64) -> Result<i32> {
        self.repository.increment_click(id).await
    }

    pub async fn set_active(&self, ctx: &AuthContext, id: i64, active: bool) -> Result<Carousel> {
        ctx.require(Permission::Admin)?;
        let carousel = self.repository.set_active(id, active).await?;
        let action = if active { "activate_carousel" } else { "deactivate_carousel" };
        log_admin_action(ctx.user_id, action, Some(&id.to_string()), None);
        Ok(carousel)
    }
}
