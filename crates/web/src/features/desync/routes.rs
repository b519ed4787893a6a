use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{list_desync_issues, sync_user};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/issues", get(list_desync_issues))
        .route("/users/:user_id/sync", post(sync_user))
}
