use axum::Router;

use crate::features::{assessments, desync, skills, tournaments};
use crate::state::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/tournaments", tournaments::routes::routes())
        .nest("/assessments", assessments::routes::routes())
        .nest("/desync", desync::routes::routes())
        .nest("/users", skills::routes::routes())
}
