//! Tournament lifecycle: `DRAFT -> ENROLLMENT_OPEN -> IN_PROGRESS -> COMPLETED -> REWARDS_DISTRIBUTED`.
//!
//! Transitions only move one step forward. Asking for the current state again
//! is a no-op. Transitions never touch rankings or rewards; those operations
//! check the current state themselves.

use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::Idempotent;
use crate::error::{EntityKind, Result, StorageError};
use crate::models::{StatusChange, Tournament, TournamentStatus};
use crate::repository::TournamentRepository;

pub fn can_transition(tournament: &Tournament, target: TournamentStatus) -> bool {
    is_allowed(tournament.status, target)
}

pub fn is_allowed(current: TournamentStatus, target: TournamentStatus) -> bool {
    current == target || current.next() == Some(target)
}

/// Apply a transition inside the caller's transaction. The tournament row is
/// locked first so concurrent transitions serialize.
pub async fn transition(
    conn: &mut PgConnection,
    tournament_id: Uuid,
    target: TournamentStatus,
    actor: &str,
) -> Result<Idempotent<Tournament>> {
    let mut repo = TournamentRepository::new(conn);
    let tournament = repo.lock(tournament_id).await?;

    if tournament.status == target {
        debug!(%tournament_id, status = %target, "tournament already in requested state");
        return Ok(Idempotent::Duplicate(tournament));
    }

    if !can_transition(&tournament, target) {
        return Err(StorageError::invalid_transition(
            EntityKind::Tournament,
            tournament_id,
            tournament.status,
            target,
        ));
    }

    let updated = repo
        .set_status(tournament_id, tournament.status, target, actor)
        .await?;

    info!(%tournament_id, from = %tournament.status, to = %target, actor, "tournament transitioned");

    Ok(Idempotent::Applied(updated))
}

/// Operator-facing transition. `REWARDS_DISTRIBUTED` is refused here: only
/// reward distribution may enter it, together with `rewards_distributed_at`.
#[instrument(skip(pool))]
pub async fn advance_tournament(
    pool: &PgPool,
    tournament_id: Uuid,
    target: TournamentStatus,
    actor: &str,
) -> Result<Idempotent<Tournament>> {
    let mut tx = pool.begin().await?;

    if target == TournamentStatus::RewardsDistributed {
        let current = TournamentRepository::new(&mut tx).find_by_id(tournament_id).await?;
        if current.status != target {
            return Err(StorageError::invalid_transition(
                EntityKind::Tournament,
                tournament_id,
                current.status,
                target,
            ));
        }
    }

    let outcome = transition(&mut tx, tournament_id, target, actor).await?;
    tx.commit().await?;

    Ok(outcome)
}

pub async fn get_tournament(pool: &PgPool, tournament_id: Uuid) -> Result<Tournament> {
    let mut conn = pool.acquire().await?;
    TournamentRepository::new(&mut conn).find_by_id(tournament_id).await
}

pub async fn status_history(pool: &PgPool, tournament_id: Uuid) -> Result<Vec<StatusChange>> {
    let mut conn = pool.acquire().await?;
    let mut repo = TournamentRepository::new(&mut conn);
    repo.find_by_id(tournament_id).await?;
    repo.history(tournament_id).await
}
