//! Registration model and its review state machine

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::models::user::Gender;
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::helpers::is_valid_phone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
            RegistrationStatus::Cancelled => "cancelled",
        }
    }

    /// Chinese label used in spreadsheet exports
    pub fn label(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "待审核",
            RegistrationStatus::Approved => "已通过",
            RegistrationStatus::Rejected => "已拒绝",
            RegistrationStatus::Cancelled => "已取消",
        }
    }

    /// Registrations in a counted status occupy a seat on the event
    pub fn is_counted(&self) -> bool {
        matches!(self, RegistrationStatus::Pending | RegistrationStatus::Approved)
    }

    pub fn can_transition_to(&self, next: RegistrationStatus) -> bool {
        use RegistrationStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Rejected)
                | (Approved, Cancelled)
                | (Rejected, Cancelled)
        )
    }

    /// Check a transition, returning the change to apply to the event's
    /// participant counter (`0` or `-1`).
    pub fn transition(&self, next: RegistrationStatus) -> Result<i32> {
        if !self.can_transition_to(next) {
            return Err(SportsHubError::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        Ok(if self.is_counted() && !next.is_counted() { -1 } else { 0 })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

/// Registration row joined with event title and account names
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: i64,
    pub event_id: i64,
    pub event_title: String,
    pub user_id: i64,
    pub username: String,
    pub user_real_name: String,
    pub status: RegistrationStatus,
    pub registration_number: String,
    pub participant_name: String,
    pub participant_phone: String,
    pub participant_id_card: String,
    pub participant_gender: Option<Gender>,
    pub participant_birth_date: Option<NaiveDate>,
    pub participant_organization: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub payment_status: PaymentStatus,
    pub payment_amount: Decimal,
    pub payment_time: Option<DateTime<Utc>>,
    pub remarks: String,
    pub review_remarks: String,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// Name used to match spreadsheet rows and to label exports
    pub fn participant_display_name(&self) -> &str {
        if !self.participant_name.is_empty() {
            &self.participant_name
        } else if !self.user_real_name.is_empty() {
            &self.user_real_name
        } else {
            &self.username
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantDetails {
    pub participant_name: Option<String>,
    pub participant_phone: Option<String>,
    pub participant_id_card: Option<String>,
    pub participant_gender: Option<Gender>,
    pub participant_birth_date: Option<NaiveDate>,
    pub participant_organization: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub remarks: Option<String>,
}

impl ParticipantDetails {
    pub fn validate(&self) -> Result<()> {
        for phone in [&self.participant_phone, &self.emergency_phone].into_iter().flatten() {
            if !phone.is_empty() && !is_valid_phone(phone) {
                return Err(SportsHubError::invalid("Phone number must be 11 digits"));
            }
        }
        if let Some(id_card) = &self.participant_id_card {
            if id_card.chars().count() > 18 {
                return Err(SportsHubError::invalid("ID card number is too long"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRegistrationRequest {
    pub event: i64,
    #[serde(flatten)]
    pub details: ParticipantDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewRequest {
    pub review_remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkReviewRequest {
    pub ids: Vec<i64>,
    #[serde(default)]
    pub review_remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkIdsRequest {
    pub ids: Vec<i64>,
}

/// Outcome of a bulk operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub affected: usize,
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationFilter {
    pub status: Option<RegistrationStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub event: Option<i64>,
    pub user: Option<i64>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationExportQuery {
    pub event: i64,
    #[serde(default)]
    pub status: Option<RegistrationStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use RegistrationStatus::*;

    #[test]
    fn test_pending_transitions() {
        assert_eq!(Pending.transition(Approved).unwrap(), 0);
        assert_eq!(Pending.transition(Rejected).unwrap(), -1);
        assert_eq!(Pending.transition(Cancelled).unwrap(), -1);
    }

    #[test]
    fn test_approved_transitions() {
        assert!(Approved.transition(Approved).is_err());
        assert!(Approved.transition(Pending).is_err());
        assert_eq!(Approved.transition(Rejected).unwrap(), -1);
        assert_eq!(Approved.transition(Cancelled).unwrap(), -1);
    }

    #[test]
    fn test_rejected_cancel_does_not_touch_counter() {
        assert_eq!(Rejected.transition(Cancelled).unwrap(), 0);
        assert!(Rejected.transition(Approved).is_err());
    }

    #[test]
    fn test_cancelled_is_terminal() {
        for next in [Pending, Approved, Rejected, Cancelled] {
            assert!(Cancelled.transition(next).is_err());
        }
    }

    #[test]
    fn test_counted_statuses() {
        assert!(Pending.is_counted());
        assert!(Approved.is_counted());
        assert!(!Rejected.is_counted());
        assert!(!Cancelled.is_counted());
    }

    #[test]
    fn test_participant_phone_validation() {
        let details = ParticipantDetails {
            participant_phone: Some("123".into()),
            ..Default::default()
        };
        assert!(details.validate().is_err());
        let details = ParticipantDetails {
            participant_phone: Some("13912345678".into()),
            emergency_phone: Some(String::new()),
            ..Default::default()
        };
        assert!(details.validate().is_ok());
    }

    #[test]
    fn test_create_request_flattens_details() {
        let req: CreateRegistrationRequest = serde_json::from_str(
            r#"{"event": 3, "participant_name": "张三", "remarks": "first time"}"#,
        )
        .unwrap();
        assert_eq!(req.event, 3);
        assert_eq!(req.details.participant_name.as_deref(), Some("张三"));
        assert_eq!(req.details.remarks.as_deref(), Some("first time"));
    }
}
