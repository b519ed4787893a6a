use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::{
    Database,
    dto::{
        ranking::{FinalizeSessionRequest, RankingsResponse, RecordedResultsResponse},
        reward::{DistributeRewardsRequest, DistributionResponse, RewardSummary},
        tournament::{
            StatusHistoryResponse, TournamentResponse, TransitionRequest, TransitionResponse,
        },
    },
    services::{aggregation, lifecycle, rewards},
};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

/// 201 for a fresh write, 200 for a replay of an earlier one.
fn write_status(duplicate: bool) -> StatusCode {
    if duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    }
}

#[utoipa::path(
    get,
    path = "/api/tournaments/{tournament_id}",
    params(
        ("tournament_id" = Uuid, Path, description = "Tournament ID")
    ),
    responses(
        (status = 200, description = "Tournament found", body = TournamentResponse),
        (status = 404, description = "Tournament not found")
    ),
    tag = "tournaments"
)]
pub async fn get_tournament(
    State(db): State<Database>,
    Path(tournament_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let tournament = lifecycle::get_tournament(db.pool(), tournament_id).await?;

    Ok(Json(TournamentResponse::from(tournament)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/tournaments/{tournament_id}/status-history",
    params(
        ("tournament_id" = Uuid, Path, description = "Tournament ID")
    ),
    responses(
        (status = 200, description = "Status changes, oldest first", body = StatusHistoryResponse),
        (status = 404, description = "Tournament not found")
    ),
    tag = "tournaments"
)]
pub async fn get_status_history(
    State(db): State<Database>,
    Path(tournament_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let history = lifecycle::status_history(db.pool(), tournament_id).await?;

    Ok(Json(StatusHistoryResponse {
        tournament_id,
        history,
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/tournaments/{tournament_id}/transitions",
    params(
        ("tournament_id" = Uuid, Path, description = "Tournament ID")
    ),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Tournament is in the requested state", body = TransitionResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Tournament not found"),
        (status = 409, description = "Transition not allowed from the current state")
    ),
    tag = "tournaments"
)]
pub async fn transition_tournament(
    State(db): State<Database>,
    Path(tournament_id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let outcome =
        lifecycle::advance_tournament(db.pool(), tournament_id, req.target, &req.actor).await?;
    let changed = !outcome.is_duplicate();

    Ok(Json(TransitionResponse {
        tournament: TournamentResponse::from(outcome.into_inner()),
        changed,
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/tournaments/{tournament_id}/sessions/{session_id}/finalize",
    params(
        ("tournament_id" = Uuid, Path, description = "Tournament ID"),
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    request_body = FinalizeSessionRequest,
    responses(
        (status = 201, description = "Rankings written", body = RankingsResponse),
        (status = 200, description = "Rankings already existed and are returned unchanged", body = RankingsResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Tournament or session not found"),
        (status = 409, description = "Tournament is not in progress"),
        (status = 422, description = "Some configured rounds have no results")
    ),
    tag = "tournaments"
)]
pub async fn finalize_session(
    State(state): State<AppState>,
    Path((tournament_id, session_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<FinalizeSessionRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let outcome = aggregation::finalize_session(
        state.db.pool(),
        &state.config,
        tournament_id,
        session_id,
        &req.results,
    )
    .await?;
    let created = !outcome.is_duplicate();

    Ok((
        write_status(outcome.is_duplicate()),
        Json(RankingsResponse::new(
            tournament_id,
            created,
            outcome.into_inner(),
        )),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/tournaments/{tournament_id}/sessions/{session_id}/results",
    params(
        ("tournament_id" = Uuid, Path, description = "Tournament ID"),
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    request_body = FinalizeSessionRequest,
    responses(
        (status = 201, description = "Results stored for a later finalize", body = RecordedResultsResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Tournament or session not found"),
        (status = 409, description = "Tournament is not in progress or already finalized")
    ),
    tag = "tournaments"
)]
pub async fn record_results(
    State(state): State<AppState>,
    Path((tournament_id, session_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<FinalizeSessionRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let appended = aggregation::record_round_results(
        state.db.pool(),
        &state.config,
        tournament_id,
        session_id,
        &req.results,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordedResultsResponse {
            tournament_id,
            session_id,
            appended,
        }),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/tournaments/{tournament_id}/rankings",
    params(
        ("tournament_id" = Uuid, Path, description = "Tournament ID")
    ),
    responses(
        (status = 200, description = "Rankings ordered by rank, empty until finalized", body = RankingsResponse),
        (status = 404, description = "Tournament not found")
    ),
    tag = "tournaments"
)]
pub async fn get_rankings(
    State(db): State<Database>,
    Path(tournament_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let rankings = aggregation::list_rankings(db.pool(), tournament_id).await?;

    Ok(Json(RankingsResponse::new(tournament_id, false, rankings)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/tournaments/{tournament_id}/rewards",
    params(
        ("tournament_id" = Uuid, Path, description = "Tournament ID")
    ),
    request_body = DistributeRewardsRequest,
    responses(
        (status = 201, description = "Rewards distributed", body = DistributionResponse),
        (status = 200, description = "Rewards had already been distributed", body = DistributionResponse),
        (status = 404, description = "Tournament not found"),
        (status = 409, description = "Tournament is not completed"),
        (status = 422, description = "Tournament has no rankings"),
        (status = 503, description = "Contended, retry later")
    ),
    tag = "tournaments"
)]
pub async fn distribute_rewards(
    State(state): State<AppState>,
    Path(tournament_id): Path<Uuid>,
    Json(req): Json<DistributeRewardsRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let outcome = rewards::distribute_rewards(
        state.db.pool(),
        &state.config,
        state.ledger.as_ref(),
        tournament_id,
        &req.actor,
    )
    .await?;
    let duplicate = outcome.is_duplicate();

    Ok((
        write_status(duplicate),
        Json(DistributionResponse::new(!duplicate, outcome.into_inner())),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/tournaments/{tournament_id}/rewards",
    params(
        ("tournament_id" = Uuid, Path, description = "Tournament ID")
    ),
    responses(
        (status = 200, description = "Ledger entries written for the tournament", body = RewardSummary),
        (status = 404, description = "Tournament not found")
    ),
    tag = "tournaments"
)]
pub async fn get_reward_summary(
    State(state): State<AppState>,
    Path(tournament_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let summary =
        rewards::reward_summary(state.db.pool(), state.ledger.as_ref(), tournament_id).await?;

    Ok(Json(summary).into_response())
}
