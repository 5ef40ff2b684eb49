//! Likes, favorites and comments on polymorphic targets

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::utils::errors::{Result, SportsHubError};

pub const MAX_COMMENT_CHARS: usize = 1000;

/// Kind of row an interaction points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Event,
    Announcement,
    Result,
    Comment,
    Carousel,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Event => "event",
            TargetType::Announcement => "announcement",
            TargetType::Result => "result",
            TargetType::Comment => "comment",
            TargetType::Carousel => "carousel",
        }
    }

    /// Table holding the target rows
    pub fn table(&self) -> &'static str {
        match self {
            TargetType::Event => "events",
            TargetType::Announcement => "announcements",
            TargetType::Result => "results",
            TargetType::Comment => "comments",
            TargetType::Carousel => "carousels",
        }
    }

    /// Accepts plain names and dotted `app.model` labels, case-insensitively;
    /// the last dotted segment decides.
    pub fn parse(raw: &str) -> Result<Self> {
        let name = raw.rsplit('.').next().unwrap_or(raw).trim().to_lowercase();
        match name.as_str() {
            "event" => Ok(TargetType::Event),
            "announcement" => Ok(TargetType::Announcement),
            "result" => Ok(TargetType::Result),
            "comment" => Ok(TargetType::Comment),
            "carousel" => Ok(TargetType::Carousel),
            _ => Err(SportsHubError::invalid(format!("Unsupported target type: {}", raw))),
        }
    }
}

/// Target reference as sent by clients: `target_type` or `content_type`
/// plus `target_id` or `object_id`. Query-string filters copy these fields
/// inline since flattened structs lose numeric parsing there.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetParams {
    pub target_type: Option<String>,
    pub content_type: Option<String>,
    pub target_id: Option<i64>,
    pub object_id: Option<i64>,
}

impl TargetParams {
    pub fn resolve(&self) -> Result<(TargetType, i64)> {
        let raw = self
            .target_type
            .as_deref()
            .or(self.content_type.as_deref())
            .ok_or_else(|| SportsHubError::invalid("target_type is required"))?;
        let target_type = TargetType::parse(raw)?;
        let target_id = self
            .target_id
            .or(self.object_id)
            .ok_or_else(|| SportsHubError::invalid("target_id is required"))?;
        Ok((target_type, target_id))
    }

    /// Like `resolve`, but both parts may be absent for list filters
    pub fn resolve_optional(&self) -> Result<(Option<TargetType>, Option<i64>)> {
        let target_type = match self.target_type.as_deref().or(self.content_type.as_deref()) {
            Some(raw) => Some(TargetType::parse(raw)?),
            None => None,
        };
        Ok((target_type, self.target_id.or(self.object_id)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub target_type: TargetType,
    pub target_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub target_type: TargetType,
    pub target_id: i64,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
}

/// Event summary embedded in favorites of events
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FavoriteEventInfo {
    pub id: i64,
    pub title: String,
    pub cover_image: String,
    pub event_type: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteView {
    #[serde(flatten)]
    pub favorite: Favorite,
    pub event_info: Option<FavoriteEventInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFavoriteRequest {
    #[serde(flatten)]
    pub target: TargetParams,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub user_real_name: String,
    pub user_avatar: String,
    pub target_type: TargetType,
    pub target_id: i64,
    pub content: String,
    pub parent_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub reply_to_username: Option<String>,
    pub is_approved: bool,
    pub like_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(flatten)]
    pub target: TargetParams,
    pub content: String,
    #[serde(default)]
    pub parent: Option<i64>,
    #[serde(default)]
    pub reply_to: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

pub fn validate_comment_content(content: &str) -> Result<()> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(SportsHubError::invalid("Comment content is required"));
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(SportsHubError::invalid(format!(
            "Comment cannot exceed {} characters",
            MAX_COMMENT_CHARS
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentFilter {
    pub target_type: Option<String>,
    pub content_type: Option<String>,
    pub target_id: Option<i64>,
    pub object_id: Option<i64>,
    pub parent: Option<i64>,
    /// Only top-level comments when true
    pub top_level: Option<bool>,
    pub is_approved: Option<bool>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionFilter {
    pub target_type: Option<String>,
    pub content_type: Option<String>,
    pub target_id: Option<i64>,
    pub object_id: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl InteractionFilter {
    pub fn target(&self) -> TargetParams {
        TargetParams {
            target_type: self.target_type.clone(),
            content_type: self.content_type.clone(),
            target_id: self.target_id,
            object_id: self.object_id,
        }
    }
}

impl CommentFilter {
    pub fn target(&self) -> TargetParams {
        TargetParams {
            target_type: self.target_type.clone(),
            content_type: self.content_type.clone(),
            target_id: self.target_id,
            object_id: self.object_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted_labels() {
        assert_eq!(TargetType::parse("events.event").unwrap(), TargetType::Event);
        assert_eq!(TargetType::parse("Announcement").unwrap(), TargetType::Announcement);
        assert_eq!(TargetType::parse("interactions.Comment").unwrap(), TargetType::Comment);
        assert!(TargetType::parse("users.user").is_err());
    }

    #[test]
    fn test_resolve_prefers_target_fields() {
        let params = TargetParams {
            target_type: Some("event".into()),
            content_type: Some("announcement".into()),
            target_id: Some(3),
            object_id: Some(9),
        };
        assert_eq!(params.resolve().unwrap(), (TargetType::Event, 3));
    }

    #[test]
    fn test_resolve_falls_back_to_content_type() {
        let params = TargetParams {
            content_type: Some("results.result".into()),
            object_id: Some(4),
            ..Default::default()
        };
        assert_eq!(params.resolve().unwrap(), (TargetType::Result, 4));
        assert!(TargetParams::default().resolve().is_err());
    }

    #[test]
    fn test_comment_length_limit() {
        assert!(validate_comment_content("  ").is_err());
        assert!(validate_comment_content(&"赛".repeat(MAX_COMMENT_CHARS)).is_ok());
        assert!(validate_comment_content(&"赛".repeat(MAX_COMMENT_CHARS + 1)).is_err());
    }
}
