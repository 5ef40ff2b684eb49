//! Feedback service implementation
//!
//! Anonymous feedback keeps its author for administrators only.

use crate::database::repositories::FeedbackRepository;
use crate::models::Page;
use crate::models::feedback::{
    CreateFeedbackRequest, Feedback, FeedbackFilter, FeedbackStatistics, FeedbackStatus, ReplyFeedbackRequest,
    UpdateFeedbackRequest,
};
use crate::services::auth::{AuthContext, Permission};
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::logging::{log_admin_action, log_user_action};

#[derive(Debug, Clone)]
pub struct FeedbackService {
    repository: FeedbackRepository,
}

impl FeedbackService {
    pub fn new(repository: FeedbackRepository) -> Self {
        Self { repository }
    }

    pub async fn create(&self, ctx: &AuthContext, request: &CreateFeedbackRequest) -> Result<Feedback> {
        request.validate()?;
        let feedback = self.repository.create(request, ctx.user_id).await?;
        log_user_action(ctx.user_id, "submit_feedback", Some(&feedback.id.to_string()));
        Ok(feedback)
    }

    /// Admins see all feedback, others their own
    pub async fn list(&self, ctx: &AuthContext, filter: &FeedbackFilter) -> Result<Page<Feedback>> {
        let only_user = if ctx.is_admin() { None } else { Some(ctx.user_id) };
        let page = self.repository.list(filter, only_user).await?;
        let admin = ctx.is_admin();
        Ok(page.map(|feedback| feedback.redact_for(admin)))
    }

    pub async fn get_visible(&self, ctx: &AuthContext, id: i64) -> Result<Feedback> {
        let feedback = self.repository.get(id).await?;
        if !ctx.is_admin() && feedback.user_id != Some(ctx.user_id) {
            return Err(SportsHubError::not_found("Feedback", id));
        }
        Ok(feedback.redact_for(ctx.is_admin()))
    }

    /// Update (owner or admin)
    pub async fn update(&self, ctx: &AuthContext, id: i64, request: &UpdateFeedbackRequest) -> Result<Feedback> {
        self.get_visible(ctx, id).await?;
        if let Some(images) = &request.images {
            if images.len() > 9 {
                return Err(SportsHubError::invalid("At most 9 images may be attached"));
            }
        }
        let feedback = self.repository.update(id, request).await?;
        Ok(feedback.redact_for(ctx.is_admin()))
    }

    pub async fn delete(&self, ctx: &AuthContext, id: i64) -> Result<()> {
        self.get_visible(ctx, id).await?;
        self.repository.delete(id).await?;
        log_user_action(ctx.user_id, "delete_feedback", Some(&id.to_string()));
        Ok(())
    }

    /// Reply to feedback; the status defaults to resolved
    pub async fn reply(&self, ctx: &AuthContext, id: i64, request: &ReplyFeedbackRequest) -> Result<Feedback> {
        ctx.require(Permission::Admin)?;
        if request.reply.trim().is_empty() {
            return Err(SportsHubError::invalid("Reply content is required"));
        }

        let status = request.status.unwrap_or(FeedbackStatus::Resolved);
        let feedback = self.repository.reply(id, request.reply.trim(), status, ctx.user_id).await?;
        log_admin_action(ctx.user_id, "reply_feedback", Some(&id.to_string()), Some(status.as_str()));
        Ok(feedback)
    }

    pub async fn update_status(&self, ctx: &AuthContext, id: i64, status: FeedbackStatus) -> Result<Feedback> {
        ctx.require(Permission::Admin)?;
        let feedback = self.repository.set_status(id, status, ctx.user_id).await?;
        log_admin_action(ctx.user_id, "update_feedback_status", Some(&id.to_string()), Some(status.as_str()));
        Ok(feedback)
    }

    pub async fn mine(&self, ctx: &AuthContext) -> Result<Vec<Feedback>> {
        self.repository.for_user(ctx.user_id).await
    }

    pub async fn pending(&self, ctx: &AuthContext) -> Result<Vec<Feedback>> {
        ctx.require(Permission::Admin)?;
        self.repository.pending().await
    }

    pub async fn statistics(&self, ctx: &AuthContext) -> Result<FeedbackStatistics> {
        ctx.require(Permission::Admin)?;
        self.repository.statistics().await
    }
}
