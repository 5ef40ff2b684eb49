//! Announcement model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::utils::errors::{Result, SportsHubError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementType {
    System,
    Event,
    News,
    Notice,
}

impl Default for AnnouncementType {
    fn default() -> Self {
        AnnouncementType::Notice
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub announcement_type: AnnouncementType,
    pub priority: Priority,
    pub event_id: Option<i64>,
    pub author_id: i64,
    pub author_name: String,
    pub cover_image: String,
    pub attachments: String,
    pub is_published: bool,
    pub is_pinned: bool,
    pub view_count: i32,
    pub publish_time: Option<DateTime<Utc>>,
    pub expire_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    /// Visible to the public: published and not yet expired
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.is_published && self.expire_time.map_or(true, |expire| expire >= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub announcement_type: AnnouncementType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub event: Option<i64>,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub attachments: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub publish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expire_time: Option<DateTime<Utc>>,
}

impl CreateAnnouncementRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(SportsHubError::invalid("Title and content are required"));
        }
        if let (Some(publish), Some(expire)) = (self.publish_time, self.expire_time) {
            if expire < publish {
                return Err(SportsHubError::invalid("Expire time must not precede publish time"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub announcement_type: Option<AnnouncementType>,
    pub priority: Option<Priority>,
    pub event: Option<i64>,
    pub cover_image: Option<String>,
    pub attachments: Option<String>,
    pub is_published: Option<bool>,
    pub is_pinned: Option<bool>,
    pub publish_time: Option<DateTime<Utc>>,
    pub expire_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncementFilter {
    pub announcement_type: Option<AnnouncementType>,
    pub priority: Option<Priority>,
    pub is_published: Option<bool>,
    pub is_pinned: Option<bool>,
    pub event: Option<i64>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expire_before_publish_rejected() {
        let now = Utc::now();
        let req = CreateAnnouncementRequest {
            title: "赛程调整".into(),
            content: "details".into(),
            summary: String::new(),
            announcement_type: AnnouncementType::Event,
            priority: Priority::High,
            event: None,
            cover_image: String::new(),
            attachments: String::new(),
            is_published: true,
            is_pinned: false,
            publish_time: Some(now),
            expire_time: Some(now - Duration::hours(1)),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_defaults_from_json() {
        let req: CreateAnnouncementRequest =
            serde_json::from_str(r#"{"title": "t", "content": "c"}"#).unwrap();
        assert_eq!(req.announcement_type, AnnouncementType::Notice);
        assert_eq!(req.priority, Priority::Normal);
        assert!(!req.is_published);
    }
}
