use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{StatusChange, Tournament, TournamentStatus};

/// Request payload for moving a tournament along its lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TransitionRequest {
    pub target: TournamentStatus,

    #[validate(length(min = 1, max = 255, message = "actor must be between 1 and 255 characters"))]
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TournamentResponse {
    pub tournament_id: Uuid,
    pub name: String,
    pub status: TournamentStatus,
    /// Human-readable form of `status`, derived on the fly.
    pub status_label: String,
    pub rewards_distributed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tournament> for TournamentResponse {
    fn from(tournament: Tournament) -> Self {
        Self {
            tournament_id: tournament.tournament_id,
            name: tournament.name,
            status_label: status_label(tournament.status).to_string(),
            status: tournament.status,
            rewards_distributed_at: tournament.rewards_distributed_at,
            created_at: tournament.created_at,
            updated_at: tournament.updated_at,
        }
    }
}

pub fn status_label(status: TournamentStatus) -> &'static str {
    match status {
        TournamentStatus::Draft => "Draft",
        TournamentStatus::EnrollmentOpen => "Enrollment open",
        TournamentStatus::InProgress => "In progress",
        TournamentStatus::Completed => "Completed",
        TournamentStatus::RewardsDistributed => "Rewards distributed",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransitionResponse {
    pub tournament: TournamentResponse,
    /// False when the tournament was already in the requested state.
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusHistoryResponse {
    pub tournament_id: Uuid,
    pub history: Vec<StatusChange>,
}
