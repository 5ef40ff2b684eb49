//! Likes, favorites and comments
//!
//! Every comment mutation marks the word cloud dirty; the broadcaster
//! coalesces those marks into one recompute.

use crate::database::DatabaseService;
use crate::database::repositories::interaction::CommentQuery;
use crate::models::Page;
use crate::models::interaction::{
    validate_comment_content, Comment, CommentFilter, CommentView, CreateCommentRequest, CreateFavoriteRequest,
    Favorite, FavoriteView, InteractionFilter, Like, TargetParams, TargetType, UpdateCommentRequest,
};
use crate::services::auth::{AuthContext, Permission};
use crate::services::wordcloud::{Snapshot, WordCloudBroadcaster};
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::logging::{log_admin_action, log_user_action};

#[derive(Debug, Clone)]
pub struct InteractionService {
    db: DatabaseService,
    wordcloud: WordCloudBroadcaster,
}

impl InteractionService {
    pub fn new(db: DatabaseService, wordcloud: WordCloudBroadcaster) -> Self {
        Self { db, wordcloud }
    }

    async fn resolve_target(&self, params: &TargetParams) -> Result<(TargetType, i64)> {
        let (target_type, target_id) = params.resolve()?;
        if !self.db.interactions.target_exists(target_type, target_id).await? {
            return Err(SportsHubError::invalid(format!(
                "Target {} {} does not exist",
                target_type.as_str(),
                target_id
            )));
        }
        Ok((target_type, target_id))
    }

    // Likes

    pub async fn list_likes(&self, ctx: &AuthContext, filter: &InteractionFilter) -> Result<Page<Like>> {
        let target = filter.target().resolve_optional()?;
        self.db
            .interactions
            .list_likes(ctx.user_id, target, filter.page, filter.page_size)
            .await
    }

    pub async fn like(&self, ctx: &AuthContext, params: &TargetParams) -> Result<Like> {
        let (target_type, target_id) = self.resolve_target(params).await?;
        let like = self
            .db
            .interactions
            .create_like(ctx.user_id, target_type, target_id)
            .await?
            .ok_or_else(|| SportsHubError::Conflict("Target already liked".to_string()))?;

        log_user_action(ctx.user_id, "like", Some(&format!("{}:{}", target_type.as_str(), target_id)));
        Ok(like)
    }

    pub async fn unlike(&self, ctx: &AuthContext, params: &TargetParams) -> Result<()> {
        let (target_type, target_id) = params.resolve()?;
        if !self.db.interactions.unlike(ctx.user_id, target_type, target_id).await? {
            return Err(SportsHubError::not_found("Like", format!("{}:{}", target_type.as_str(), target_id)));
        }
        Ok(())
    }

    pub async fn has_liked(&self, ctx: &AuthContext, params: &TargetParams) -> Result<bool> {
        let (target_type, target_id) = params.resolve()?;
        self.db.interactions.has_liked(ctx.user_id, target_type, target_id).await
    }

    pub async fn get_like(&self, ctx: &AuthContext, id: i64) -> Result<Like> {
        self.db
            .interactions
            .find_like(id)
            .await?
            .filter(|like| like.user_id == ctx.user_id)
            .ok_or_else(|| SportsHubError::not_found("Like", id))
    }

    /// Delete one of the caller's own likes
    pub async fn delete_like(&self, ctx: &AuthContext, id: i64) -> Result<()> {
        self.get_like(ctx, id).await?;
        self.db.interactions.delete_like(id).await?;
        Ok(())
    }

    // Favorites

    pub async fn list_favorites(&self, ctx: &AuthContext, filter: &InteractionFilter) -> Result<Page<FavoriteView>> {
        let target = filter.target().resolve_optional()?;
        let page = self
            .db
            .interactions
            .list_favorites(ctx.user_id, target, filter.page, filter.page_size)
            .await?;
        self.db.favorites_with_events(page).await
    }

    pub async fn favorite(&self, ctx: &AuthContext, request: &CreateFavoriteRequest) -> Result<Favorite> {
        let (target_type, target_id) = self.resolve_target(&request.target).await?;
        let favorite = self
            .db
            .interactions
            .create_favorite(ctx.user_id, target_type, target_id, request.remarks.trim())
            .await?
            .ok_or_else(|| SportsHubError::Conflict("Target already in favorites".to_string()))?;

        log_user_action(ctx.user_id, "favorite", Some(&format!("{}:{}", target_type.as_str(), target_id)));
        Ok(favorite)
    }

    pub async fn unfavorite(&self, ctx: &AuthContext, params: &TargetParams) -> Result<()> {
        let (target_type, target_id) = params.resolve()?;
        if !self.db.interactions.unfavorite(ctx.user_id, target_type, target_id).await? {
            return Err(SportsHubError::not_found("Favorite", format!("{}:{}", target_type.as_str(), target_id)));
        }
        Ok(())
    }

    pub async fn has_favorited(&self, ctx: &AuthContext, params: &TargetParams) -> Result<bool> {
        let (target_type, target_id) = params.resolve()?;
        self.db.interactions.has_favorited(ctx.user_id, target_type, target_id).await
    }

    pub async fn get_favorite(&self, ctx: &AuthContext, id: i64) -> Result<Favorite> {
        self.db
            .interactions
            .find_favorite(id)
            .await?
            .filter(|favorite| favorite.user_id == ctx.user_id)
            .ok_or_else(|| SportsHubError::not_found("Favorite", id))
    }

    pub async fn delete_favorite(&self, ctx: &AuthContext, id: i64) -> Result<()> {
        self.get_favorite(ctx, id).await?;
        self.db.interactions.delete_favorite(id).await?;
        Ok(())
    }

    // Comments

    /// Non-admins only see approved comments
    pub async fn list_comments(&self, ctx: Option<&AuthContext>, filter: &CommentFilter) -> Result<Page<Comment>> {
        let (target_type, target_id) = filter.target().resolve_optional()?;
        let query = CommentQuery {
            target_type,
            target_id,
            parent: filter.parent,
            top_level: filter.top_level,
            is_approved: filter.is_approved,
            search: filter.search.clone(),
            approved_only: !ctx.is_some_and(AuthContext::is_admin),
            page: filter.page,
            page_size: filter.page_size,
        };
        self.db.interactions.list_comments(&query).await
    }

    pub async fn get_comment(&self, ctx: Option<&AuthContext>, id: i64) -> Result<CommentView> {
        let admin = ctx.is_some_and(AuthContext::is_admin);
        let view = self.db.comment_with_replies(id, !admin).await?;
        if !admin && !view.comment.is_approved {
            return Err(SportsHubError::not_found("Comment", id));
        }
        Ok(view)
    }

    pub async fn create_comment(&self, ctx: &AuthContext, request: &CreateCommentRequest) -> Result<Comment> {
        validate_comment_content(&request.content)?;
        let (target_type, target_id) = self.resolve_target(&request.target).await?;

        if let Some(parent_id) = request.parent {
            let parent = self
                .db
                .interactions
                .find_comment(parent_id)
                .await?
                .ok_or_else(|| SportsHubError::invalid(format!("Parent comment {} does not exist", parent_id)))?;
            check_reply(&parent, target_type, target_id, request.reply_to)?;
        } else if request.reply_to.is_some() {
            return Err(SportsHubError::invalid("reply_to requires a parent comment"));
        }

        let comment = self
            .db
            .interactions
            .create_comment(ctx.user_id, target_type, target_id, &request.content, request.parent, request.reply_to)
            .await?;

        log_user_action(ctx.user_id, "comment", Some(&comment.id.to_string()));
        self.wordcloud.mark_dirty();
        Ok(comment)
    }

    /// Update (owner or admin)
    pub async fn update_comment(&self, ctx: &AuthContext, id: i64, request: &UpdateCommentRequest) -> Result<Comment> {
        validate_comment_content(&request.content)?;
        let current = self.db.interactions.get_comment(id).await?;
        ctx.require_owner_or_admin(current.user_id)?;

        let comment = self.db.interactions.update_comment(id, &request.content).await?;
        self.wordcloud.mark_dirty();
        Ok(comment)
    }

    pub async fn delete_comment(&self, ctx: &AuthContext, id: i64) -> Result<()> {
        let current = self.db.interactions.get_comment(id).await?;
        ctx.require_owner_or_admin(current.user_id)?;

        self.db.interactions.delete_comment(id).await?;
        log_user_action(ctx.user_id, "delete_comment", Some(&id.to_string()));
        self.wordcloud.mark_dirty();
        Ok(())
    }

    pub async fn set_comment_approved(&self, ctx: &AuthContext, id: i64, approved: bool) -> Result<Comment> {
        ctx.require(Permission::Admin)?;
        let comment = self.db.interactions.set_comment_approved(id, approved).await?;

        let action = if approved { "approve_comment" } else { "reject_comment" };
        log_admin_action(ctx.user_id, action, Some(&id.to_string()), None);
        self.wordcloud.mark_dirty();
        Ok(comment)
    }

    /// Bump the comment's like counter
    pub async fn like_comment(&self, id: i64) -> Result<i32> {
        self.db.interactions.increment_comment_likes(id).await
    }

    pub fn wordcloud(&self) -> Snapshot {
        self.wordcloud.current()
    }
}

/// A reply must sit on its parent's target and may only address the parent's author
fn check_reply(parent: &Comment, target_type: TargetType, target_id: i64, reply_to: Option<i64>) -> Result<()> {
    if parent.target_type != target_type || parent.target_id != target_id {
        return Err(SportsHubError::invalid("Parent comment belongs to a different target"));
    }
    if let Some(reply_to) = reply_to {
        if reply_to != parent.user_id {
            return Err(SportsHubError::invalid("reply_to must be the author of the parent comment"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn parent() -> Comment {
        let now = Utc::now();
        Comment {
            id: 1,
            user_id: 7,
            username: "alice".into(),
            user_real_name: String::new(),
            user_avatar: String::new(),
            target_type: TargetType::Event,
            target_id: 3,
            content: "比赛很精彩".into(),
            parent_id: None,
            reply_to_id: None,
            reply_to_username: None,
            is_approved: true,
            like_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reply_on_same_target() {
        assert!(check_reply(&parent(), TargetType::Event, 3, None).is_ok());
        assert!(check_reply(&parent(), TargetType::Event, 3, Some(7)).is_ok());
    }

    #[test]
    fn test_reply_on_other_target_rejected() {
        assert!(check_reply(&parent(), TargetType::Event, 4, None).is_err());
        assert!(check_reply(&parent(), TargetType::Announcement, 3, None).is_err());
    }

    #[test]
    fn test_reply_to_must_be_parent_author() {
        let err = check_reply(&parent(), TargetType::Event, 3, Some(8)).unwrap_err();
        assert!(matches!(err, SportsHubError::InvalidInput(_)));
    }
}
