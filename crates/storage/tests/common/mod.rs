#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use sqlx::PgPool;
use storage::dto::ranking::RoundResultInput;
use storage::models::{ParticipantType, RoundOutcome, TournamentStatus};
use uuid::Uuid;

pub struct Fixture {
    pub tournament_id: Uuid,
    pub session_id: Uuid,
    pub users: Vec<Uuid>,
}

pub async fn tournament(pool: &PgPool, status: TournamentStatus) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO tournaments (name, status) VALUES ($1, $2) RETURNING tournament_id",
    )
    .bind("Harbour Open")
    .bind(status)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn enroll(pool: &PgPool, tournament_id: Uuid, count: usize) -> Vec<Uuid> {
    let base = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let mut users = Vec::with_capacity(count);

    for i in 0..count {
        let user_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO tournament_participants (tournament_id, user_id, participant_type, enrolled_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(tournament_id)
        .bind(user_id)
        .bind(ParticipantType::Individual)
        .bind(base + Duration::minutes(i as i64))
        .execute(pool)
        .await
        .unwrap();
        users.push(user_id);
    }

    users
}

pub async fn session(pool: &PgPool, tournament_id: Uuid, rounds: i32) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO tournament_sessions (tournament_id, rounds_configured) VALUES ($1, $2) RETURNING session_id",
    )
    .bind(tournament_id)
    .bind(rounds)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn map_skill(pool: &PgPool, tournament_id: Uuid, skill: &str, role: &str) {
    sqlx::query(
        "INSERT INTO tournament_skill_mappings (tournament_id, skill_name, role) VALUES ($1, $2, $3::skill_role)",
    )
    .bind(tournament_id)
    .bind(skill)
    .bind(role)
    .execute(pool)
    .await
    .unwrap();
}

/// An in-progress tournament with `count` participants and a two-round session.
pub async fn in_progress(pool: &PgPool, count: usize) -> Fixture {
    let tournament_id = tournament(pool, TournamentStatus::InProgress).await;
    let users = enroll(pool, tournament_id, count).await;
    let session_id = session(pool, tournament_id, 2).await;

    Fixture {
        tournament_id,
        session_id,
        users,
    }
}

pub fn result(user_id: Uuid, round: i32, points: i32, outcome: RoundOutcome) -> RoundResultInput {
    RoundResultInput {
        round_number: round,
        user_id,
        participant_type: ParticipantType::Individual,
        points,
        outcome,
    }
}

/// Seven players in round one, a two-player decider in round two: nine results.
pub fn nine_results(users: &[Uuid]) -> Vec<RoundResultInput> {
    let mut results: Vec<RoundResultInput> = users
        .iter()
        .enumerate()
        .map(|(i, user)| {
            let points = (7 - i as i32) * 10;
            let outcome = if i < 3 {
                RoundOutcome::Win
            } else {
                RoundOutcome::Loss
            };
            result(*user, 1, points, outcome)
        })
        .collect();

    results.push(result(users[0], 2, 30, RoundOutcome::Win));
    results.push(result(users[1], 2, 0, RoundOutcome::Loss));
    results
}

pub async fn count(pool: &PgPool, table: &str, tournament_id: Uuid) -> i64 {
    let column = match table {
        "rankings" | "round_results" => "tournament_id",
        _ => "source_id",
    };
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM {table} WHERE {column} = $1"
    ))
    .bind(tournament_id)
    .fetch_one(pool)
    .await
    .unwrap()
}
