use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a tournament. This column is the only place status is stored;
/// any textual form is derived from it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "tournament_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentStatus {
    Draft,
    EnrollmentOpen,
    InProgress,
    Completed,
    RewardsDistributed,
}

impl TournamentStatus {
    pub const ALL: [TournamentStatus; 5] = [
        Self::Draft,
        Self::EnrollmentOpen,
        Self::InProgress,
        Self::Completed,
        Self::RewardsDistributed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::EnrollmentOpen => "ENROLLMENT_OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::RewardsDistributed => "REWARDS_DISTRIBUTED",
        }
    }

    /// The single state reachable from this one, if any.
    pub fn next(&self) -> Option<TournamentStatus> {
        match self {
            Self::Draft => Some(Self::EnrollmentOpen),
            Self::EnrollmentOpen => Some(Self::InProgress),
            Self::InProgress => Some(Self::Completed),
            Self::Completed => Some(Self::RewardsDistributed),
            Self::RewardsDistributed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "participant_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParticipantType {
    Individual,
    Team,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Tournament {
    pub tournament_id: Uuid,
    pub name: String,
    pub status: TournamentStatus,
    pub rewards_distributed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the append-only status history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StatusChange {
    pub history_id: i64,
    pub tournament_id: Uuid,
    pub from_status: TournamentStatus,
    pub to_status: TournamentStatus,
    pub actor: String,
    pub changed_at: DateTime<Utc>,
}

/// Enrollment record supplied by the enrollment subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Participant {
    pub tournament_id: Uuid,
    pub user_id: Uuid,
    pub participant_type: ParticipantType,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TournamentSession {
    pub session_id: Uuid,
    pub tournament_id: Uuid,
    pub rounds_configured: i32,
}
