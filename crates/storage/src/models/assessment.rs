use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "assessment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentStatus {
    NotAssessed,
    Assessed,
    Validated,
    Archived,
}

impl AssessmentStatus {
    pub const ALL: [AssessmentStatus; 4] = [
        Self::NotAssessed,
        Self::Assessed,
        Self::Validated,
        Self::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAssessed => "NOT_ASSESSED",
            Self::Assessed => "ASSESSED",
            Self::Validated => "VALIDATED",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Active rows are the ones covered by the partial unique index.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Assessed | Self::Validated)
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SkillAssessment {
    pub assessment_id: Uuid,
    pub user_id: Uuid,
    pub skill_name: String,
    pub score: i32,
    pub status: AssessmentStatus,
    pub requires_validation: bool,
    pub assessed_by: String,
    pub assessed_at: DateTime<Utc>,
    pub validated_by: Option<String>,
    pub validated_at: Option<DateTime<Utc>>,
    pub archived_reason: Option<String>,
    pub previous_status: Option<AssessmentStatus>,
    pub status_changed_at: DateTime<Utc>,
    pub status_changed_by: String,
}
