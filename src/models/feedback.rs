//! Feedback model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;

use crate::utils::errors::{Result, SportsHubError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Bug,
    Suggestion,
    Complaint,
    Praise,
    Other,
}

impl Default for FeedbackType {
    fn default() -> Self {
        FeedbackType::Suggestion
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Pending,
    Processing,
    Resolved,
    Closed,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::Processing => "processing",
            FeedbackStatus::Resolved => "resolved",
            FeedbackStatus::Closed => "closed",
        }
    }

    /// Terminal statuses stamp the handler
    pub fn is_handled(&self) -> bool {
        matches!(self, FeedbackStatus::Resolved | FeedbackStatus::Closed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub feedback_type: FeedbackType,
    pub title: String,
    pub content: String,
    pub images: Json<Vec<String>>,
    pub contact_info: String,
    pub event_id: Option<i64>,
    pub status: FeedbackStatus,
    pub reply: String,
    pub handler_id: Option<i64>,
    pub handled_at: Option<DateTime<Utc>>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feedback {
    /// Hide the author of anonymous feedback from non-administrators
    pub fn redact_for(mut self, viewer_is_admin: bool) -> Self {
        if self.is_anonymous && !viewer_is_admin {
            self.user_id = None;
            self.username = None;
            self.contact_info.clear();
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeedbackRequest {
    #[serde(default)]
    pub feedback_type: FeedbackType,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub event: Option<i64>,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl CreateFeedbackRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(SportsHubError::invalid("Title and content are required"));
        }
        if self.images.len() > 9 {
            return Err(SportsHubError::invalid("At most 9 images may be attached"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateFeedbackRequest {
    pub feedback_type: Option<FeedbackType>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub images: Option<Vec<String>>,
    pub contact_info: Option<String>,
    pub event: Option<i64>,
    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyFeedbackRequest {
    pub reply: String,
    #[serde(default)]
    pub status: Option<FeedbackStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFeedbackStatusRequest {
    pub status: FeedbackStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct FeedbackStatistics {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub resolved: i64,
    pub closed: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackFilter {
    pub feedback_type: Option<FeedbackType>,
    pub status: Option<FeedbackStatus>,
    pub event: Option<i64>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(anonymous: bool) -> Feedback {
        let now = Utc::now();
        Feedback {
            id: 1,
            user_id: Some(5),
            username: Some("runner".into()),
            feedback_type: FeedbackType::Bug,
            title: "t".into(),
            content: "c".into(),
            images: Json(vec![]),
            contact_info: "13800138000".into(),
            event_id: None,
            status: FeedbackStatus::Pending,
            reply: String::new(),
            handler_id: None,
            handled_at: None,
            is_anonymous: anonymous,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_anonymous_redacted_for_public() {
        let redacted = sample(true).redact_for(false);
        assert!(redacted.user_id.is_none());
        assert!(redacted.contact_info.is_empty());
        assert_eq!(sample(true).redact_for(true).user_id, Some(5));
        assert_eq!(sample(false).redact_for(false).user_id, Some(5));
    }

    #[test]
    fn test_handled_statuses() {
        assert!(FeedbackStatus::Resolved.is_handled());
        assert!(FeedbackStatus::Closed.is_handled());
        assert!(!FeedbackStatus::Processing.is_handled());
    }

    #[test]
    fn test_unknown_status_rejected() {
        let parsed: std::result::Result<UpdateFeedbackStatusRequest, _> =
            serde_json::from_str(r#"{"status": "archived"}"#);
        assert!(parsed.is_err());
    }
}
