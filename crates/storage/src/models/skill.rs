use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::SkillRole;

/// Current rating plus the EMA carried forward between tournaments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SkillRating {
    pub user_id: Uuid,
    pub skill_name: String,
    pub rating: f64,
    pub previous_ema: f64,
    pub updates: i32,
    pub updated_at: DateTime<Utc>,
}

/// Which skills a tournament exercises, and how strongly.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SkillMapping {
    pub tournament_id: Uuid,
    pub skill_name: String,
    pub role: SkillRole,
}
