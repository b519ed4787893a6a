use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::ParticipantType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "round_outcome", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoundOutcome {
    Win,
    Draw,
    Loss,
}

/// Append-only per-round score submitted by the scheduling subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RoundResult {
    pub result_id: i64,
    pub tournament_id: Uuid,
    pub session_id: Uuid,
    pub round_number: i32,
    pub user_id: Uuid,
    pub participant_type: ParticipantType,
    pub points: i32,
    pub outcome: RoundOutcome,
    pub submitted_at: DateTime<Utc>,
}

/// Final standing of one participant; immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Ranking {
    pub tournament_id: Uuid,
    pub user_id: Uuid,
    pub participant_type: ParticipantType,
    pub rank: i32,
    pub points: i64,
    pub losses: i32,
}
