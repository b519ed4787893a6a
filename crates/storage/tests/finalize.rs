mod common;

use std::sync::Arc;

use sqlx::PgPool;
use storage::models::{RoundOutcome, TournamentStatus};
use storage::services::{aggregation, finalize_session, lifecycle, record_round_results};
use storage::{EngineConfig, Idempotent, StorageError};
use tokio::task::JoinSet;

use common::{count, in_progress, nine_results, result};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn seven_participants_get_dense_ranks(pool: PgPool) {
    let fx = in_progress(&pool, 7).await;
    let config = EngineConfig::default();

    let outcome = finalize_session(
        &pool,
        &config,
        fx.tournament_id,
        fx.session_id,
        &nine_results(&fx.users),
    )
    .await
    .unwrap();

    assert!(!outcome.is_duplicate());
    let rankings = outcome.into_inner();
    assert_eq!(rankings.len(), 7);
    assert_eq!(
        rankings.iter().map(|r| r.rank).collect::<Vec<_>>(),
        (1..=7).collect::<Vec<_>>()
    );
    assert_eq!(rankings[0].user_id, fx.users[0]);
    assert_eq!(rankings[0].points, 100);
    assert_eq!(count(&pool, "rankings", fx.tournament_id).await, 7);
    assert_eq!(count(&pool, "round_results", fx.tournament_id).await, 9);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn second_finalize_writes_nothing(pool: PgPool) {
    let fx = in_progress(&pool, 7).await;
    let config = EngineConfig::default();
    let results = nine_results(&fx.users);

    let first = finalize_session(&pool, &config, fx.tournament_id, fx.session_id, &results)
        .await
        .unwrap();
    let second = finalize_session(&pool, &config, fx.tournament_id, fx.session_id, &results)
        .await
        .unwrap();

    assert!(second.is_duplicate());
    assert_eq!(first.into_inner(), second.into_inner());
    assert_eq!(count(&pool, "rankings", fx.tournament_id).await, 7);
    assert_eq!(count(&pool, "round_results", fx.tournament_id).await, 9);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn parallel_finalizers_commit_one_ranking_set(pool: PgPool) {
    let fx = in_progress(&pool, 7).await;
    let config = Arc::new(EngineConfig::default());
    let results = Arc::new(nine_results(&fx.users));

    let mut callers = JoinSet::new();
    for _ in 0..8 {
        let pool = pool.clone();
        let config = Arc::clone(&config);
        let results = Arc::clone(&results);
        let (tournament_id, session_id) = (fx.tournament_id, fx.session_id);
        callers.spawn(async move {
            finalize_session(&pool, &config, tournament_id, session_id, &results).await
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = callers.join_next().await {
        outcomes.push(joined.unwrap().unwrap());
    }

    let applied = outcomes
        .iter()
        .filter(|o| matches!(o, Idempotent::Applied(_)))
        .count();
    assert_eq!(applied, 1);

    let expected = outcomes[0].get().clone();
    assert!(outcomes.iter().all(|o| *o.get() == expected));
    assert_eq!(count(&pool, "rankings", fx.tournament_id).await, 7);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn missing_round_is_insufficient_data(pool: PgPool) {
    let fx = in_progress(&pool, 3).await;
    let config = EngineConfig::default();
    let only_round_one: Vec<_> = fx
        .users
        .iter()
        .map(|u| result(*u, 1, 5, RoundOutcome::Draw))
        .collect();

    let err = finalize_session(
        &pool,
        &config,
        fx.tournament_id,
        fx.session_id,
        &only_round_one,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, StorageError::InsufficientData(_)));
    // the failed call rolled back its results too
    assert_eq!(count(&pool, "round_results", fx.tournament_id).await, 0);
    assert_eq!(count(&pool, "rankings", fx.tournament_id).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn draft_tournaments_cannot_be_finalized(pool: PgPool) {
    let tournament_id = common::tournament(&pool, TournamentStatus::Draft).await;
    let users = common::enroll(&pool, tournament_id, 2).await;
    let session_id = common::session(&pool, tournament_id, 1).await;
    let config = EngineConfig::default();

    let err = finalize_session(
        &pool,
        &config,
        tournament_id,
        session_id,
        &[result(users[0], 1, 3, RoundOutcome::Win)],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, StorageError::InvalidStateTransition { .. }));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn rankings_survive_completion(pool: PgPool) {
    let fx = in_progress(&pool, 7).await;
    let config = EngineConfig::default();
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

    let listed = aggregation::list_rankings(&pool, fx.tournament_id).await.unwrap();
    assert_eq!(listed.len(), 7);
    assert_eq!(listed[6].rank, 7);
}

/// Two players, two single-round sessions.
async fn two_sessions(pool: &PgPool) -> (uuid::Uuid, [uuid::Uuid; 2], Vec<uuid::Uuid>) {
    let tournament_id = common::tournament(pool, TournamentStatus::InProgress).await;
    let users = common::enroll(pool, tournament_id, 2).await;
    let first = common::session(pool, tournament_id, 1).await;
    let second = common::session(pool, tournament_id, 1).await;
    (tournament_id, [first, second], users)
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn rankings_sum_points_across_sessions(pool: PgPool) {
    let (tournament_id, [first, second], users) = two_sessions(&pool).await;
    let config = EngineConfig::default();

    let appended = record_round_results(
        &pool,
        &config,
        tournament_id,
        first,
        &[
            result(users[0], 1, 20, RoundOutcome::Win),
            result(users[1], 1, 18, RoundOutcome::Loss),
        ],
    )
    .await
    .unwrap();
    assert_eq!(appended, 2);
    assert_eq!(count(&pool, "rankings", tournament_id).await, 0);

    let outcome = finalize_session(
        &pool,
        &config,
        tournament_id,
        second,
        &[
            result(users[1], 1, 100, RoundOutcome::Win),
            result(users[0], 1, 0, RoundOutcome::Loss),
        ],
    )
    .await
    .unwrap();

    assert!(!outcome.is_duplicate());
    let rankings = outcome.into_inner();
    assert_eq!(rankings[0].user_id, users[1]);
    assert_eq!(rankings[0].points, 118);
    assert_eq!(rankings[1].user_id, users[0]);
    assert_eq!(rankings[1].points, 20);
    assert_eq!(count(&pool, "round_results", tournament_id).await, 4);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn finalize_waits_for_every_session(pool: PgPool) {
    let (tournament_id, [first, second], users) = two_sessions(&pool).await;
    let config = EngineConfig::default();

    let err = finalize_session(
        &pool,
        &config,
        tournament_id,
        first,
        &[
            result(users[0], 1, 20, RoundOutcome::Win),
            result(users[1], 1, 18, RoundOutcome::Loss),
        ],
    )
    .await
    .unwrap_err();

    match err {
        StorageError::InsufficientData(msg) => assert!(msg.contains(&second.to_string())),
        other => panic!("expected InsufficientData, got {other:?}"),
    }
    assert_eq!(count(&pool, "round_results", tournament_id).await, 0);
    assert_eq!(count(&pool, "rankings", tournament_id).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn results_after_finalize_are_refused(pool: PgPool) {
    let fx = in_progress(&pool, 7).await;
    let config = EngineConfig::default();
    finalize_session(
        &pool,
        &config,
        fx.tournament_id,
        fx.session_id,
        &nine_results(&fx.users),
    )
    .await
    .unwrap();

    let err = record_round_results(
        &pool,
        &config,
        fx.tournament_id,
        fx.session_id,
        &[result(fx.users[3], 2, 50, RoundOutcome::Win)],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, StorageError::InvalidStateTransition { .. }));
    assert_eq!(count(&pool, "round_results", fx.tournament_id).await, 9);
}
