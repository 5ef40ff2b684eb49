//! Competition result model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::utils::errors::{Result, SportsHubError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    Preliminary,
    Semifinal,
    Final,
}

impl Default for RoundType {
    fn default() -> Self {
        RoundType::Final
    }
}

impl RoundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundType::Preliminary => "preliminary",
            RoundType::Semifinal => "semifinal",
            RoundType::Final => "final",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RoundType::Preliminary => "预赛",
            RoundType::Semifinal => "半决赛",
            RoundType::Final => "决赛",
        }
    }

    /// Export order: final first, then semifinal, then preliminary
    pub fn export_rank(&self) -> u8 {
        match self {
            RoundType::Final => 0,
            RoundType::Semifinal => 1,
            RoundType::Preliminary => 2,
        }
    }
}

/// Result row joined with event title and participant names
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompetitionResult {
    pub id: i64,
    pub event_id: i64,
    pub event_title: String,
    pub registration_id: i64,
    pub registration_number: String,
    pub participant_name: String,
    pub user_id: i64,
    pub username: String,
    pub user_real_name: String,
    pub round_type: RoundType,
    pub score: String,
    pub rank: Option<i32>,
    pub award: String,
    pub score_unit: String,
    pub remarks: String,
    pub certificate_url: String,
    pub is_published: bool,
    pub recorded_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompetitionResult {
    pub fn display_name(&self) -> &str {
        if !self.participant_name.is_empty() {
            &self.participant_name
        } else if !self.user_real_name.is_empty() {
            &self.user_real_name
        } else {
            &self.username
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResultRequest {
    pub event: i64,
    pub registration: i64,
    #[serde(default)]
    pub round_type: RoundType,
    pub score: String,
    #[serde(default)]
    pub rank: Option<i32>,
    #[serde(default)]
    pub award: String,
    #[serde(default)]
    pub score_unit: String,
    #[serde(default)]
    pub remarks: String,
    #[serde(default)]
    pub certificate_url: String,
    #[serde(default)]
    pub is_published: bool,
}

impl CreateResultRequest {
    pub fn validate(&self) -> Result<()> {
        validate_score(&self.score)?;
        validate_rank(self.rank)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateResultRequest {
    pub round_type: Option<RoundType>,
    pub score: Option<String>,
    pub rank: Option<i32>,
    pub award: Option<String>,
    pub score_unit: Option<String>,
    pub remarks: Option<String>,
    pub certificate_url: Option<String>,
    pub is_published: Option<bool>,
}

impl UpdateResultRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(score) = &self.score {
            validate_score(score)?;
        }
        validate_rank(self.rank)
    }
}

fn validate_score(score: &str) -> Result<()> {
    let score = score.trim();
    if score.is_empty() || score.chars().count() > 50 {
        return Err(SportsHubError::invalid("Score must be 1-50 characters"));
    }
    Ok(())
}

fn validate_rank(rank: Option<i32>) -> Result<()> {
    match rank {
        Some(r) if r < 1 => Err(SportsHubError::invalid("Rank must be a positive integer")),
        _ => Ok(()),
    }
}

/// Row-level failure reported by the spreadsheet import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row: usize,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub errors: Vec<ImportRowError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultFilter {
    pub event: Option<i64>,
    pub round_type: Option<RoundType>,
    pub is_published: Option<bool>,
    pub user: Option<i64>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    pub event: i64,
    #[serde(default)]
    pub round_type: RoundType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultExportQuery {
    pub event: i64,
    #[serde(default)]
    pub round_type: Option<RoundType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_order() {
        let mut rounds = vec![RoundType::Preliminary, RoundType::Final, RoundType::Semifinal];
        rounds.sort_by_key(|r| r.export_rank());
        assert_eq!(rounds, vec![RoundType::Final, RoundType::Semifinal, RoundType::Preliminary]);
    }

    #[test]
    fn test_rank_must_be_positive() {
        assert!(validate_rank(Some(0)).is_err());
        assert!(validate_rank(Some(1)).is_ok());
        assert!(validate_rank(None).is_ok());
    }

    #[test]
    fn test_blank_score_rejected() {
        assert!(validate_score("   ").is_err());
        assert!(validate_score("10.52s").is_ok());
    }

    #[test]
    fn test_default_round_is_final() {
        let req: CreateResultRequest =
            serde_json::from_str(r#"{"event": 1, "registration": 2, "score": "9.8"}"#).unwrap();
        assert_eq!(req.round_type, RoundType::Final);
        assert!(!req.is_published);
    }
}
