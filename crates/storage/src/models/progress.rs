use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A user's position on a specialization's progress ladder.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SpecializationProgress {
    pub user_id: Uuid,
    pub specialization: String,
    pub current_level: i32,
    pub updated_at: DateTime<Utc>,
}

/// Credential issued for a specialization. Only active licenses count when
/// comparing against the progress ladder.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserLicense {
    pub license_id: Uuid,
    pub user_id: Uuid,
    pub specialization: String,
    pub license_level: i32,
    pub is_active: bool,
    pub issued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
