use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{ParticipantType, Ranking, RoundOutcome};

/// One participant's result in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct RoundResultInput {
    #[validate(range(min = 1, message = "round_number must be >= 1"))]
    pub round_number: i32,

    pub user_id: Uuid,

    #[serde(default = "default_participant_type")]
    pub participant_type: ParticipantType,

    #[validate(range(min = 0, message = "points must not be negative"))]
    pub points: i32,

    pub outcome: RoundOutcome,
}

fn default_participant_type() -> ParticipantType {
    ParticipantType::Individual
}

/// Request payload for finalizing a session
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct FinalizeSessionRequest {
    #[validate(length(min = 1, message = "at least one round result is required"))]
    #[validate(nested)]
    pub results: Vec<RoundResultInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordedResultsResponse {
    pub tournament_id: Uuid,
    pub session_id: Uuid,
    /// Rows newly stored; resubmitted entries are not counted.
    pub appended: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RankingEntry {
    pub rank: i32,
    pub user_id: Uuid,
    pub participant_type: ParticipantType,
    pub points: i64,
    pub losses: i32,
}

impl From<Ranking> for RankingEntry {
    fn from(ranking: Ranking) -> Self {
        Self {
            rank: ranking.rank,
            user_id: ranking.user_id,
            participant_type: ranking.participant_type,
            points: ranking.points,
            losses: ranking.losses,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RankingsResponse {
    pub tournament_id: Uuid,
    /// False when the rankings had already been finalized by an earlier call.
    pub created: bool,
    pub rankings: Vec<RankingEntry>,
}

impl RankingsResponse {
    pub fn new(tournament_id: Uuid, created: bool, rankings: Vec<Ranking>) -> Self {
        Self {
            tournament_id,
            created,
            rankings: rankings.into_iter().map(RankingEntry::from).collect(),
        }
    }
}
