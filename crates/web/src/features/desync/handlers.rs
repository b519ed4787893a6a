use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use storage::{
    Database,
    dto::{
        common::{PaginatedResponse, PaginationParams},
        desync::{DesyncFilter, DesyncIssue, SyncRequest, SyncResult},
    },
    services::desync,
};
use uuid::Uuid;

use crate::error::WebError;

#[utoipa::path(
    get,
    path = "/api/desync/issues",
    params(DesyncFilter, PaginationParams),
    responses(
        (status = 200, description = "Users whose progress ladder and license disagree", body = PaginatedResponse<DesyncIssue>),
        (status = 400, description = "Invalid query parameters")
    ),
    tag = "desync"
)]
pub async fn list_desync_issues(
    State(db): State<Database>,
    Query(filter): Query<DesyncFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, WebError> {
    pagination.validate().map_err(WebError::BadRequest)?;

    let issues = desync::find_desync_issues(db.pool(), filter.specialization.as_deref()).await?;
    let (page, total_items) = pagination.slice(issues);

    Ok(Json(PaginatedResponse::new(
        page,
        pagination.page,
        pagination.page_size,
        total_items,
    ))
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/desync/users/{user_id}/sync",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Changes applied; empty when already in sync", body = SyncResult)
    ),
    tag = "desync"
)]
pub async fn sync_user(
    State(db): State<Database>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SyncRequest>,
) -> Result<Response, WebError> {
    let result = desync::sync_user(db.pool(), user_id, req.direction).await?;

    Ok(Json(result).into_response())
}
