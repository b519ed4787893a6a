use axum::{Router, routing::get};

use super::handlers::list_skill_ratings;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/:user_id/skills", get(list_skill_ratings))
}
