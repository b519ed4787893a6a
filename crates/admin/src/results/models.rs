use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage::dto::ranking::RoundResultInput;
use storage::models::{ParticipantType, RoundOutcome};
use uuid::Uuid;

pub const FORMAT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsFile {
    pub format_version: String,
    pub source: SourceMetadata,
    pub tournament_id: Uuid,
    pub session_id: Uuid,
    pub rounds: Vec<RoundData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(rename = "type")]
    pub r#type: SourceType,
    pub exported_at: DateTime<Utc>,
    pub exporter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Scoreboard,
    Csv,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundData {
    pub round_number: i32,
    pub results: Vec<EntryData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryData {
    pub user_id: Uuid,
    #[serde(default = "default_participant_type")]
    pub participant_type: ParticipantType,
    pub points: i32,
    pub outcome: RoundOutcome,
}

fn default_participant_type() -> ParticipantType {
    ParticipantType::Individual
}

impl ResultsFile {
    pub fn result_count(&self) -> usize {
        self.rounds.iter().map(|r| r.results.len()).sum()
    }

    /// Flatten into the per-round inputs session finalization takes.
    pub fn to_inputs(&self) -> Vec<RoundResultInput> {
        self.rounds
            .iter()
            .flat_map(|round| {
                round.results.iter().map(move |entry| RoundResultInput {
                    round_number: round.round_number,
                    user_id: entry.user_id,
                    participant_type: entry.participant_type,
                    points: entry.points,
                    outcome: entry.outcome,
                })
            })
            .collect()
    }
}
