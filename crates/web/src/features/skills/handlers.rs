use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use storage::{Database, models::SkillRating, services::skill_progression};
use uuid::Uuid;

use crate::error::WebError;

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/skills",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Current skill ratings, by skill name", body = Vec<SkillRating>)
    ),
    tag = "skills"
)]
pub async fn list_skill_ratings(
    State(db): State<Database>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let ratings = skill_progression::skill_ratings(db.pool(), user_id).await?;

    Ok(Json(ratings).into_response())
}
