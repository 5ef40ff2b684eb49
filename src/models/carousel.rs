//! Carousel slide model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::utils::errors::{Result, SportsHubError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CarouselPosition {
    Home,
    Event,
    Announcement,
}

impl Default for CarouselPosition {
    fn default() -> Self {
        CarouselPosition::Home
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Carousel {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: String,
    pub link_url: String,
    pub event_id: Option<i64>,
    pub position: CarouselPosition,
    pub sort_order: i32,
    pub is_active: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub click_count: i32,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Carousel {
    /// Active and inside its optional display window
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.start_time.map_or(true, |start| start <= now)
            && self.end_time.map_or(true, |end| end >= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCarouselRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub link_url: String,
    #[serde(default)]
    pub event: Option<i64>,
    #[serde(default)]
    pub position: CarouselPosition,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl CreateCarouselRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.image.trim().is_empty() {
            return Err(SportsHubError::invalid("Title and image are required"));
        }
        validate_link(&self.link_url)?;
        validate_window(self.start_time, self.end_time)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateCarouselRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub link_url: Option<String>,
    pub event: Option<i64>,
    pub position: Option<CarouselPosition>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl UpdateCarouselRequest {
    pub fn validate_against(&self, current: &Carousel) -> Result<()> {
        if let Some(link) = &self.link_url {
            validate_link(link)?;
        }
        validate_window(
            self.start_time.or(current.start_time),
            self.end_time.or(current.end_time),
        )
    }
}

/// Links must be absolute http(s) URLs when present
fn validate_link(link: &str) -> Result<()> {
    if link.is_empty() {
        return Ok(());
    }
    let parsed = url::Url::parse(link)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SportsHubError::invalid("Link must be an http or https URL"));
    }
    Ok(())
}

fn validate_window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(SportsHubError::invalid("End time must not precede start time"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselFilter {
    pub position: Option<CarouselPosition>,
    pub is_active: Option<bool>,
    pub event: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionQuery {
    pub position: Option<CarouselPosition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_link_validation() {
        assert!(validate_link("").is_ok());
        assert!(validate_link("https://example.com/events/3").is_ok());
        assert!(validate_link("ftp://example.com").is_err());
        assert!(validate_link("/relative").is_err());
    }

    #[test]
    fn test_is_live_window() {
        let now = Utc::now();
        let slide = Carousel {
            id: 1,
            title: "t".into(),
            description: String::new(),
            image: "/media/a.png".into(),
            link_url: String::new(),
            event_id: None,
            position: CarouselPosition::Home,
            sort_order: 0,
            is_active: true,
            start_time: Some(now - Duration::hours(1)),
            end_time: Some(now + Duration::hours(1)),
            click_count: 0,
            creator_id: 1,
            created_at: now,
            updated_at: now,
        };
        assert!(slide.is_live(now));
        assert!(!slide.is_live(now + Duration::hours(2)));
        let inactive = Carousel { is_active: false, ..slide };
        assert!(!inactive.is_live(now));
    }
}
