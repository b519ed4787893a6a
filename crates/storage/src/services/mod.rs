pub mod aggregation;
pub mod assessment;
pub mod desync;
pub mod lifecycle;
pub mod rewards;
pub mod skill_progression;

pub use aggregation::{finalize_session, list_rankings, record_round_results};
pub use assessment::{
    archive_assessment, create_assessment, get_assessment, list_assessments, validate_assessment,
};
pub use desync::{find_desync_issues, sync_user};
pub use lifecycle::{advance_tournament, get_tournament, status_history};
pub use rewards::{distribute_rewards, reward_summary};
pub use skill_progression::skill_ratings;
