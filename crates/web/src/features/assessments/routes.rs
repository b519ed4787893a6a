use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{
    archive_assessment, create_assessment, get_assessment, list_assessments, validate_assessment,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assessments).post(create_assessment))
        .route("/:assessment_id", get(get_assessment))
        .route("/:assessment_id/validate", post(validate_assessment))
        .route("/:assessment_id/archive", post(archive_assessment))
}
