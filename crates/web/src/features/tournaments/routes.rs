use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{
    distribute_rewards, finalize_session, get_rankings, get_reward_summary, get_status_history,
    get_tournament, record_results, transition_tournament,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:tournament_id", get(get_tournament))
        .route("/:tournament_id/status-history", get(get_status_history))
        .route("/:tournament_id/transitions", post(transition_tournament))
        .route(
            "/:tournament_id/sessions/:session_id/finalize",
            post(finalize_session),
        )
        .route(
            "/:tournament_id/sessions/:session_id/results",
            post(record_results),
        )
        .route("/:tournament_id/rankings", get(get_rankings))
        .route(
            "/:tournament_id/rewards",
            get(get_reward_summary).post(distribute_rewards),
        )
}
