use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::{
    Database,
    dto::assessment::{
        ArchiveAssessmentRequest, AssessmentFilter, AssessmentResponse, CreateAssessmentRequest,
        ValidateAssessmentRequest,
    },
    models::SkillAssessment,
    services::assessment,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;

#[utoipa::path(
    post,
    path = "/api/assessments",
    request_body = CreateAssessmentRequest,
    responses(
        (status = 201, description = "Assessment recorded; any previous active assessment was archived", body = AssessmentResponse),
        (status = 200, description = "Identical assessment already active", body = AssessmentResponse),
        (status = 400, description = "Validation error"),
        (status = 503, description = "Contended, retry later")
    ),
    tag = "assessments"
)]
pub async fn create_assessment(
    State(db): State<Database>,
    Json(req): Json<CreateAssessmentRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let outcome = assessment::create_assessment(db.pool(), &req).await?;
    let changed = !outcome.is_duplicate();
    let status = if changed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(AssessmentResponse {
            changed,
            assessment: outcome.into_inner(),
        }),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/assessments",
    params(AssessmentFilter),
    responses(
        (status = 200, description = "Assessment history for the user, newest first per skill", body = Vec<SkillAssessment>)
    ),
    tag = "assessments"
)]
pub async fn list_assessments(
    State(db): State<Database>,
    Query(filter): Query<AssessmentFilter>,
) -> Result<Response, WebError> {
    let assessments =
        assessment::list_assessments(db.pool(), filter.user_id, filter.skill_name.as_deref())
            .await?;

    Ok(Json(assessments).into_response())
}

#[utoipa::path(
    get,
    path = "/api/assessments/{assessment_id}",
    params(
        ("assessment_id" = Uuid, Path, description = "Assessment ID")
    ),
    responses(
        (status = 200, description = "Assessment found", body = SkillAssessment),
        (status = 404, description = "Assessment not found")
    ),
    tag = "assessments"
)]
pub async fn get_assessment(
    State(db): State<Database>,
    Path(assessment_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let found = assessment::get_assessment(db.pool(), assessment_id).await?;

    Ok(Json(found).into_response())
}

#[utoipa::path(
    post,
    path = "/api/assessments/{assessment_id}/validate",
    params(
        ("assessment_id" = Uuid, Path, description = "Assessment ID")
    ),
    request_body = ValidateAssessmentRequest,
    responses(
        (status = 200, description = "Assessment is validated", body = AssessmentResponse),
        (status = 404, description = "Assessment not found"),
        (status = 409, description = "Assessment cannot be validated from its current state")
    ),
    tag = "assessments"
)]
pub async fn validate_assessment(
    State(db): State<Database>,
    Path(assessment_id): Path<Uuid>,
    Json(req): Json<ValidateAssessmentRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let outcome = assessment::validate_assessment(db.pool(), assessment_id, &req).await?;

    Ok(Json(AssessmentResponse {
        changed: !outcome.is_duplicate(),
        assessment: outcome.into_inner(),
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/assessments/{assessment_id}/archive",
    params(
        ("assessment_id" = Uuid, Path, description = "Assessment ID")
    ),
    request_body = ArchiveAssessmentRequest,
    responses(
        (status = 200, description = "Assessment is archived", body = AssessmentResponse),
        (status = 404, description = "Assessment not found"),
        (status = 409, description = "Assessment cannot be archived from its current state")
    ),
    tag = "assessments"
)]
pub async fn archive_assessment(
    State(db): State<Database>,
    Path(assessment_id): Path<Uuid>,
    Json(req): Json<ArchiveAssessmentRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let outcome = assessment::archive_assessment(db.pool(), assessment_id, &req).await?;

    Ok(Json(AssessmentResponse {
        changed: !outcome.is_duplicate(),
        assessment: outcome.into_inner(),
    })
    .into_response())
}
