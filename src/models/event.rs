//! Event model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::models::result::RoundType;
use crate::utils::errors::{Result, SportsHubError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    International,
    National,
    Provincial,
    City,
    School,
}

impl Default for EventLevel {
    fn default() -> Self {
        EventLevel::School
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Published,
    Ongoing,
    Finished,
    Cancelled,
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Draft
    }
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Finished => "finished",
            EventStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses under which registrations are accepted
    pub fn accepts_registrations(&self) -> bool {
        matches!(self, EventStatus::Published | EventStatus::Ongoing)
    }
}

/// Event row joined with its organizer's names
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub cover_image: String,
    pub event_type: String,
    pub level: EventLevel,
    pub status: EventStatus,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub registration_start: DateTime<Utc>,
    pub registration_end: DateTime<Utc>,
    pub max_participants: i32,
    pub current_participants: i32,
    pub registration_fee: Decimal,
    pub rules: String,
    pub requirements: String,
    pub prizes: String,
    pub organizer_id: i64,
    pub organizer_username: String,
    pub organizer_name: String,
    pub contact_person: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub view_count: i32,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Stored status, except that published or ongoing events read as
    /// finished once their end time has passed
    pub fn display_status(&self, now: DateTime<Utc>) -> EventStatus {
        match self.status {
            EventStatus::Published | EventStatus::Ongoing if self.end_time < now => {
                EventStatus::Finished
            }
            other => other,
        }
    }

    pub fn is_full(&self) -> bool {
        self.max_participants > 0 && self.current_participants >= self.max_participants
    }

    pub fn in_registration_window(&self, now: DateTime<Utc>) -> bool {
        self.registration_start <= now && now <= self.registration_end
    }

    pub fn can_register(&self, now: DateTime<Utc>) -> bool {
        self.status.accepts_registrations() && self.in_registration_window(now) && !self.is_full()
    }
}

/// Event as returned by list endpoints
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub display_status: EventStatus,
}

impl EventView {
    pub fn new(event: Event, now: DateTime<Utc>) -> Self {
        let display_status = event.display_status(now);
        Self { event, display_status }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrganizerInfo {
    pub id: i64,
    pub username: String,
    pub real_name: String,
    pub organization: String,
}

/// Event as returned by the detail endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub display_status: EventStatus,
    pub registration_count: i32,
    pub can_register: bool,
    pub organizer_info: Option<OrganizerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub level: EventLevel,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub registration_start: DateTime<Utc>,
    pub registration_end: DateTime<Utc>,
    #[serde(default)]
    pub max_participants: i32,
    #[serde(default)]
    pub registration_fee: Decimal,
    #[serde(default)]
    pub rules: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub prizes: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub is_featured: bool,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(SportsHubError::invalid("Event title is required"));
        }
        validate_schedule(
            self.start_time,
            self.end_time,
            self.registration_start,
            self.registration_end,
        )?;
        validate_capacity(self.max_participants, self.registration_fee)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub event_type: Option<String>,
    pub level: Option<EventLevel>,
    pub status: Option<EventStatus>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub registration_start: Option<DateTime<Utc>>,
    pub registration_end: Option<DateTime<Utc>>,
    pub max_participants: Option<i32>,
    pub registration_fee: Option<Decimal>,
    pub rules: Option<String>,
    pub requirements: Option<String>,
    pub prizes: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub is_featured: Option<bool>,
}

impl UpdateEventRequest {
    /// Validate the update as applied on top of `current`
    pub fn validate_against(&self, current: &Event) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(SportsHubError::invalid("Event title is required"));
            }
        }
        validate_schedule(
            self.start_time.unwrap_or(current.start_time),
            self.end_time.unwrap_or(current.end_time),
            self.registration_start.unwrap_or(current.registration_start),
            self.registration_end.unwrap_or(current.registration_end),
        )?;
        validate_capacity(
            self.max_participants.unwrap_or(current.max_participants),
            self.registration_fee.unwrap_or(current.registration_fee),
        )
    }
}

fn validate_schedule(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    registration_start: DateTime<Utc>,
    registration_end: DateTime<Utc>,
) -> Result<()> {
    if end < start {
        return Err(SportsHubError::invalid("Event end time must not precede its start time"));
    }
    if registration_end < registration_start {
        return Err(SportsHubError::invalid(
            "Registration end must not precede registration start",
        ));
    }
    if registration_start > end {
        return Err(SportsHubError::invalid("Registration cannot open after the event ends"));
    }
    Ok(())
}

fn validate_capacity(max_participants: i32, fee: Decimal) -> Result<()> {
    if max_participants < 0 {
        return Err(SportsHubError::invalid("Max participants cannot be negative"));
    }
    if fee.is_sign_negative() {
        return Err(SportsHubError::invalid("Registration fee cannot be negative"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventFilter {
    pub event_type: Option<String>,
    pub level: Option<EventLevel>,
    pub status: Option<EventStatus>,
    pub is_featured: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Referee assignment to an event round
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventAssignment {
    pub id: i64,
    pub event_id: i64,
    pub event_title: String,
    pub referee_id: i64,
    pub referee_username: String,
    pub referee_name: String,
    pub round_type: RoundType,
    pub notes: String,
    pub assigned_by: Option<i64>,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssignmentRequest {
    pub event_id: i64,
    pub referee_id: i64,
    #[serde(default)]
    pub round_type: RoundType,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateAssignmentRequest {
    pub referee_id: Option<i64>,
    pub round_type: Option<RoundType>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentFilter {
    pub event: Option<i64>,
    pub referee: Option<i64>,
    pub round_type: Option<RoundType>,
}

/// Event a referee may record results for
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefereeEventAccess {
    pub id: i64,
    pub referee_id: i64,
    pub referee_username: String,
    pub event_id: i64,
    pub event_title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRefereeEventsRequest {
    pub referee: i64,
    #[serde(default)]
    pub event_ids: Vec<i64>,
}
