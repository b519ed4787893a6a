mod common;

use rust_decimal::Decimal;
use sqlx::PgPool;
use storage::ledger::PgLedgerWriter;
use storage::models::TournamentStatus;
use storage::services::{
    distribute_rewards, finalize_session, get_tournament, lifecycle, reward_summary, skill_ratings,
};
use storage::{EngineConfig, StorageError};
use uuid::Uuid;

use common::{count, in_progress, nine_results};

/// Finalized and completed tournament with seven ranked players.
async fn completed(pool: &PgPool, config: &EngineConfig) -> (Uuid, Vec<Uuid>) {
    let fx = in_progress(pool, 7).await;
    finalize_session(
        pool,
        config,
        fx.tournament_id,
        fx.session_id,
        &nine_results(&fx.users),
    )
    .await
    .unwrap();
    lifecycle::advance_tournament(pool, fx.tournament_id, TournamentStatus::Completed, "ops")
        .await
        .unwrap();

    (fx.tournament_id, fx.users)
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn seven_rankings_pay_configured_totals_once(pool: PgPool) {
    let config = EngineConfig::default();
    let ledger = PgLedgerWriter;
    let (tournament_id, users) = completed(&pool, &config).await;

    let first = distribute_rewards(&pool, &config, &ledger, tournament_id, "ops")
        .await
        .unwrap();
    assert!(!first.is_duplicate());

    let summary = first.into_inner();
    assert_eq!(summary.users.len(), 7);
    assert_eq!(summary.total_credits(), Decimal::from(280));
    assert_eq!(summary.total_xp(), 140);
    assert_eq!(
        summary.for_user(users[0]).unwrap().credits_awarded,
        Decimal::from(100)
    );
    assert_eq!(count(&pool, "credit_transactions", tournament_id).await, 7);
    assert_eq!(count(&pool, "xp_transactions", tournament_id).await, 7);

    let second = distribute_rewards(&pool, &config, &ledger, tournament_id, "ops")
        .await
        .unwrap();
    assert!(second.is_duplicate());
    assert_eq!(second.into_inner(), summary);
    assert_eq!(count(&pool, "credit_transactions", tournament_id).await, 7);
    assert_eq!(count(&pool, "xp_transactions", tournament_id).await, 7);

    let tournament = get_tournament(&pool, tournament_id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::RewardsDistributed);
    assert!(tournament.rewards_distributed_at.is_some());

    assert_eq!(
        reward_summary(&pool, &ledger, tournament_id).await.unwrap(),
        summary
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn mapped_skills_move_ratings_once(pool: PgPool) {
    let config = EngineConfig::default();
    let ledger = PgLedgerWriter;
    let fx = in_progress(&pool, 7).await;
    common::map_skill(&pool, fx.tournament_id, "finishing", "dominant").await;
    common::map_skill(&pool, fx.tournament_id, "passing", "supporting").await;
    finalize_session(
        &pool,
        &config,
        fx.tournament_id,
        fx.session_id,
        &nine_results(&fx.users),
    )
    .await
    .unwrap();
    lifecycle::advance_tournament(&pool, fx.tournament_id, TournamentStatus::Completed, "ops")
        .await
        .unwrap();

    distribute_rewards(&pool, &config, &ledger, fx.tournament_id, "ops")
        .await
        .unwrap();
    distribute_rewards(&pool, &config, &ledger, fx.tournament_id, "ops")
        .await
        .unwrap();

    assert_eq!(count(&pool, "skill_rewards", fx.tournament_id).await, 14);

    let winner = skill_ratings(&pool, fx.users[0]).await.unwrap();
    assert_eq!(winner.len(), 2);
    assert!(winner.iter().all(|r| r.updates == 1));
    assert!(winner.iter().all(|r| r.rating > config.skills.initial_rating));

    let last = skill_ratings(&pool, fx.users[6]).await.unwrap();
    assert!(last.iter().all(|r| r.rating < config.skills.initial_rating));
    assert!(last.iter().all(|r| r.rating >= config.skills.floor));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn in_progress_tournaments_are_not_paid(pool: PgPool) {
    let config = EngineConfig::default();
    let fx = in_progress(&pool, 3).await;

    let err = distribute_rewards(&pool, &config, &PgLedgerWriter, fx.tournament_id, "ops")
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::InvalidStateTransition { .. }));
    assert_eq!(count(&pool, "credit_transactions", fx.tournament_id).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn completed_without_rankings_is_insufficient_data(pool: PgPool) {
    let config = EngineConfig::default();
    let tournament_id = common::tournament(&pool, TournamentStatus::Completed).await;

    let err = distribute_rewards(&pool, &config, &PgLedgerWriter, tournament_id, "ops")
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::InsufficientData(_)));
    let tournament = get_tournament(&pool, tournament_id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Completed);
}
