//! Assessment data model: assessments, their ordered items, job roles,
//! and the game catalog entries items are provisioned from.

pub mod engine;
pub mod scoring;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub use engine::SessionEngine;
pub use scoring::{GameScorer, ScoreOutcome, ScorerRegistry};

/// Free-form JSON fields (`metrics`, `config_snapshot`, `integrity_flags`).
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentStatus {
    NotStarted,
    InProgress,
    Completed,
    Expired,
}

impl AssessmentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Expired => "EXPIRED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    InProgress,
    Completed,
}

impl ItemStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }
}

/// One timed game run within an assessment.
///
/// `server_deadline_at = server_started_at + timer_seconds` once started,
/// immutable thereafter. `version` backs the store's compare-and-set.
#[derive(Debug, Clone)]
pub struct AssessmentItem {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub game_id: Uuid,
    pub candidate_id: Uuid,
    pub order_index: u32,
    pub timer_seconds: i64,
    pub server_started_at: Option<DateTime<Utc>>,
    pub server_deadline_at: Option<DateTime<Utc>>,
    pub status: ItemStatus,
    pub score: Option<f64>,
    pub metrics: JsonMap,
    pub config_snapshot: JsonMap,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

#[derive(Debug, Clone)]
pub struct Assessment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub candidate_id: Uuid,
    pub job_role_id: Uuid,
    pub status: AssessmentStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub total_score: Option<f64>,
    pub integrity_flags: JsonMap,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

/// Per-trait weighting used when aggregating item scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitWeight {
    pub required: bool,
    pub weight: f64,
}

/// Hiring position: which games a candidate must play, in which order,
/// and how each measured trait weighs into the total score.
#[derive(Debug, Clone)]
pub struct JobRole {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub required_games: Vec<Uuid>,
    pub traits: BTreeMap<String, TraitWeight>,
    pub created_at: DateTime<Utc>,
}

impl JobRole {
    /// Sum of required-trait weights; provisioning warns above 1.0 but
    /// does not reject (display-only heuristic for now).
    #[must_use]
    pub fn required_weight_sum(&self) -> f64 {
        self.traits
            .values()
            .filter(|t| t.required)
            .map(|t| t.weight)
            .sum()
    }
}

/// Game catalog entry; `base_config` is frozen onto items at
/// provisioning time so later edits never alter an in-flight assessment.
#[derive(Debug, Clone)]
pub struct Game {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    /// Job-role trait this game measures, matched against `JobRole::traits`.
    pub trait_key: String,
    pub timer_seconds: i64,
    pub base_config: JsonMap,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::{AssessmentStatus, ItemStatus, JobRole, TraitWeight};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    #[test]
    fn status_tags_match_wire_format() {
        assert_eq!(AssessmentStatus::NotStarted.as_str(), "NOT_STARTED");
        assert_eq!(
            serde_json::to_string(&AssessmentStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!(serde_json::to_string(&ItemStatus::Pending).unwrap(), "\"PENDING\"");
    }

    #[test]
    fn required_weight_sum_skips_optional_traits() {
        let mut traits = BTreeMap::new();
        traits.insert(
            "attention".to_string(),
            TraitWeight {
                required: true,
                weight: 0.6,
            },
        );
        traits.insert(
            "memory".to_string(),
            TraitWeight {
                required: true,
                weight: 0.3,
            },
        );
        traits.insert(
            "curiosity".to_string(),
            TraitWeight {
                required: false,
                weight: 0.5,
            },
        );
        let role = JobRole {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            title: "Engineer".to_string(),
            description: None,
            required_games: vec![],
            traits,
            created_at: Utc::now(),
        };
        let sum = role.required_weight_sum();
        assert!((sum - 0.9).abs() < f64::EPSILON);
    }
}
