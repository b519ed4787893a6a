use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::common::validate_skill_name;
use crate::models::SkillAssessment;

/// Request payload for an instructor-submitted assessment
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateAssessmentRequest {
    pub user_id: Uuid,

    #[validate(custom(function = "validate_skill_name"))]
    pub skill_name: String,

    #[validate(range(min = 0, max = 100, message = "score must be between 0 and 100"))]
    pub score: i32,

    #[validate(length(min = 1, max = 255))]
    pub assessed_by: String,

    /// Decided by the caller from license level, instructor tenure and skill criticality.
    #[serde(default)]
    pub requires_validation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ValidateAssessmentRequest {
    #[validate(length(min = 1, max = 255))]
    pub validated_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ArchiveAssessmentRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,

    #[validate(length(min = 1, max = 255))]
    #[serde(default = "default_archived_by")]
    pub archived_by: String,
}

fn default_archived_by() -> String {
    "system".to_string()
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AssessmentFilter {
    pub user_id: Uuid,
    pub skill_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssessmentResponse {
    /// False when the call was a replay and the existing row is returned.
    pub changed: bool,
    pub assessment: SkillAssessment,
}
