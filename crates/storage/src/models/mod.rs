pub mod assessment;
pub mod progress;
pub mod ranking;
pub mod skill;
pub mod tournament;

pub use assessment::{AssessmentStatus, SkillAssessment};
pub use progress::{SpecializationProgress, UserLicense};
pub use ranking::{Ranking, RoundOutcome, RoundResult};
pub use skill::{SkillMapping, SkillRating};
pub use tournament::{
    Participant, ParticipantType, StatusChange, Tournament, TournamentSession, TournamentStatus,
};

pub use crate::ledger::{CreditTransaction, RewardSource, SkillReward, XpTransaction};
