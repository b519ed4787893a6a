pub mod assessment;
pub mod progress;
pub mod ranking;
pub mod round_result;
pub mod skill_rating;
pub mod tournament;

pub use assessment::AssessmentRepository;
pub use progress::ProgressRepository;
pub use ranking::RankingRepository;
pub use round_result::RoundResultRepository;
pub use skill_rating::SkillRatingRepository;
pub use tournament::TournamentRepository;
