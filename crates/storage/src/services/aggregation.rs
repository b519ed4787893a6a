//! Tournament finalization: round results from every session in, one ranking
//! per participant out.
//!
//! Standings are ordered by total points (desc), then losses (asc), then
//! enrollment time (asc), then participant id. That order is total, so the
//! same inputs always give the same ranks `1..=N`.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::Idempotent;
use crate::config::EngineConfig;
use crate::dto::ranking::RoundResultInput;
use crate::error::{EntityKind, Result, StorageError, classify_conflict};
use crate::models::{
    Participant, ParticipantType, Ranking, RoundOutcome, RoundResult, TournamentSession,
    TournamentStatus,
};
use crate::repository::{RankingRepository, RoundResultRepository, TournamentRepository};

pub const RANKING_PARTICIPANT_KEY: &str = "uq_rankings_participant";
pub const RANKING_RANK_KEY: &str = "uq_rankings_rank";

type ParticipantKey = (Uuid, ParticipantType);

/// The parts of a round result the aggregation needs.
#[derive(Debug, Clone, Copy)]
pub struct ScoreLine {
    pub user_id: Uuid,
    pub participant_type: ParticipantType,
    pub points: i32,
    pub outcome: RoundOutcome,
}

impl From<&RoundResult> for ScoreLine {
    fn from(result: &RoundResult) -> Self {
        Self {
            user_id: result.user_id,
            participant_type: result.participant_type,
            points: result.points,
            outcome: result.outcome,
        }
    }
}

impl From<&RoundResultInput> for ScoreLine {
    fn from(result: &RoundResultInput) -> Self {
        Self {
            user_id: result.user_id,
            participant_type: result.participant_type,
            points: result.points,
            outcome: result.outcome,
        }
    }
}

#[derive(Debug, Clone)]
struct Standing {
    user_id: Uuid,
    participant_type: ParticipantType,
    enrolled_at: DateTime<Utc>,
    points: i64,
    losses: i32,
}

fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    b.points
        .cmp(&a.points)
        .then(a.losses.cmp(&b.losses))
        .then(a.enrolled_at.cmp(&b.enrolled_at))
        .then(a.user_id.cmp(&b.user_id))
        .then(a.participant_type.cmp(&b.participant_type))
}

/// Rank every enrolled participant. Participants without results score zero.
pub fn compute_standings<I>(
    tournament_id: Uuid,
    participants: &[Participant],
    results: I,
) -> Result<Vec<Ranking>>
where
    I: IntoIterator<Item = ScoreLine>,
{
    if participants.is_empty() {
        return Err(StorageError::InsufficientData(format!(
            "tournament {tournament_id} has no enrolled participants"
        )));
    }

    let mut standings: HashMap<ParticipantKey, Standing> = participants
        .iter()
        .map(|p| {
            (
                (p.user_id, p.participant_type),
                Standing {
                    user_id: p.user_id,
                    participant_type: p.participant_type,
                    enrolled_at: p.enrolled_at,
                    points: 0,
                    losses: 0,
                },
            )
        })
        .collect();

    for line in results {
        let standing = standings
            .get_mut(&(line.user_id, line.participant_type))
            .ok_or_else(|| {
                StorageError::Validation(format!(
                    "user {} is not enrolled in tournament {tournament_id}",
                    line.user_id
                ))
            })?;

        standing.points += i64::from(line.points);
        if line.outcome == RoundOutcome::Loss {
            standing.losses += 1;
        }
    }

    let mut ordered: Vec<Standing> = standings.into_values().collect();
    ordered.sort_by(compare_standings);

    Ok(ordered
        .into_iter()
        .enumerate()
        .map(|(idx, s)| Ranking {
            tournament_id,
            user_id: s.user_id,
            participant_type: s.participant_type,
            rank: idx as i32 + 1,
            points: s.points,
            losses: s.losses,
        })
        .collect())
}

/// Reject malformed submissions before anything is written.
pub fn validate_submission(
    session: &TournamentSession,
    participants: &[Participant],
    results: &[RoundResultInput],
    max_round_points: i32,
) -> Result<()> {
    if results.is_empty() {
        return Err(StorageError::Validation(
            "at least one round result is required".into(),
        ));
    }

    let enrolled: HashSet<ParticipantKey> = participants
        .iter()
        .map(|p| (p.user_id, p.participant_type))
        .collect();
    let mut seen: HashSet<(i32, Uuid, ParticipantType)> = HashSet::new();

    for result in results {
        if result.round_number < 1 || result.round_number > session.rounds_configured {
            return Err(StorageError::Validation(format!(
                "round {} is outside 1..={}",
                result.round_number, session.rounds_configured
            )));
        }
        if !(0..=max_round_points).contains(&result.points) {
            return Err(StorageError::Validation(format!(
                "points {} for user {} are outside 0..={max_round_points}",
                result.points, result.user_id
            )));
        }
        if !enrolled.contains(&(result.user_id, result.participant_type)) {
            return Err(StorageError::Validation(format!(
                "user {} is not enrolled in tournament {}",
                result.user_id, session.tournament_id
            )));
        }
        if !seen.insert((result.round_number, result.user_id, result.participant_type)) {
            return Err(StorageError::Validation(format!(
                "user {} appears twice in round {}",
                result.user_id, result.round_number
            )));
        }
    }

    Ok(())
}

/// Every configured round needs at least one result.
pub fn ensure_rounds_complete(session: &TournamentSession, rounds_seen: &BTreeSet<i32>) -> Result<()> {
    let missing: Vec<String> = (1..=session.rounds_configured)
        .filter(|round| !rounds_seen.contains(round))
        .map(|round| round.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StorageError::InsufficientData(format!(
            "session {} has no results for round(s) {}",
            session.session_id,
            missing.join(", ")
        )))
    }
}

/// Every session of the tournament needs results for each of its configured rounds.
pub fn ensure_sessions_complete(
    sessions: &[TournamentSession],
    results: &[RoundResult],
) -> Result<()> {
    let mut rounds_seen: HashMap<Uuid, BTreeSet<i32>> = HashMap::new();
    for result in results {
        rounds_seen
            .entry(result.session_id)
            .or_default()
            .insert(result.round_number);
    }

    let none = BTreeSet::new();
    for session in sessions {
        let seen = rounds_seen.get(&session.session_id).unwrap_or(&none);
        ensure_rounds_complete(session, seen)?;
    }

    Ok(())
}

/// Append one session's results without finalizing, for tournaments that
/// play several sessions. Rankings are written later by `finalize_session`.
#[instrument(skip(pool, config, results), fields(results = results.len()))]
pub async fn record_round_results(
    pool: &PgPool,
    config: &EngineConfig,
    tournament_id: Uuid,
    session_id: Uuid,
    results: &[RoundResultInput],
) -> Result<u64> {
    let mut tx = pool.begin().await?;

    let tournament = TournamentRepository::new(&mut tx).lock(tournament_id).await?;
    if !matches!(
        tournament.status,
        TournamentStatus::InProgress | TournamentStatus::Completed
    ) {
        return Err(StorageError::invalid_transition(
            EntityKind::Tournament,
            tournament_id,
            tournament.status,
            "RECORD_RESULTS",
        ));
    }

    if RankingRepository::new(&mut tx)
        .exists_for_tournament(tournament_id)
        .await?
    {
        return Err(StorageError::invalid_transition(
            EntityKind::Tournament,
            tournament_id,
            "FINALIZED",
            "RECORD_RESULTS",
        ));
    }

    let mut tournaments = TournamentRepository::new(&mut tx);
    let session = tournaments.session(tournament_id, session_id).await?;
    let participants = tournaments.participants(tournament_id).await?;

    validate_submission(
        &session,
        &participants,
        results,
        config.skills.max_round_points,
    )?;

    let appended = RoundResultRepository::new(&mut tx)
        .append(tournament_id, session_id, results)
        .await?;

    tx.commit().await?;

    info!(%tournament_id, %session_id, appended, "round results recorded");

    Ok(appended)
}

/// Persist the submitted results and write the tournament's rankings exactly once.
///
/// Rankings sum points over every session of the tournament, so all of them
/// must be complete; results of earlier sessions arrive through
/// `record_round_results`.
///
/// Runs in one transaction holding the tournament row lock. If rankings already
/// exist (or a concurrent writer wins the unique constraint) the stored set is
/// returned as a duplicate.
#[instrument(skip(pool, config, results), fields(results = results.len()))]
pub async fn finalize_session(
    pool: &PgPool,
    config: &EngineConfig,
    tournament_id: Uuid,
    session_id: Uuid,
    results: &[RoundResultInput],
) -> Result<Idempotent<Vec<Ranking>>> {
    let mut tx = pool.begin().await?;

    let tournament = TournamentRepository::new(&mut tx).lock(tournament_id).await?;

    let existing = RankingRepository::new(&mut tx)
        .list_for_tournament(tournament_id)
        .await?;
    if !existing.is_empty() {
        tx.commit().await?;
        debug!(%tournament_id, "rankings already finalized");
        return Ok(Idempotent::Duplicate(existing));
    }

    if !matches!(
        tournament.status,
        TournamentStatus::InProgress | TournamentStatus::Completed
    ) {
        return Err(StorageError::invalid_transition(
            EntityKind::Tournament,
            tournament_id,
            tournament.status,
            "FINALIZE_SESSION",
        ));
    }

    let mut tournaments = TournamentRepository::new(&mut tx);
    let session = tournaments.session(tournament_id, session_id).await?;
    let sessions = tournaments.sessions(tournament_id).await?;
    let participants = tournaments.participants(tournament_id).await?;
    if participants.is_empty() {
        return Err(StorageError::InsufficientData(format!(
            "tournament {tournament_id} has no enrolled participants"
        )));
    }

    validate_submission(
        &session,
        &participants,
        results,
        config.skills.max_round_points,
    )?;

    let mut round_results = RoundResultRepository::new(&mut tx);
    let appended = round_results
        .append(tournament_id, session_id, results)
        .await?;
    let stored = round_results.list_for_tournament(tournament_id).await?;

    ensure_sessions_complete(&sessions, &stored)?;

    let rankings = compute_standings(
        tournament_id,
        &participants,
        stored.iter().map(ScoreLine::from),
    )?;

    if let Err(err) = RankingRepository::new(&mut tx).insert_all(&rankings).await {
        if err.violates(RANKING_PARTICIPANT_KEY) || err.violates(RANKING_RANK_KEY) {
            tx.rollback().await?;
            debug!(%tournament_id, "lost finalize race, returning committed rankings");
            let mut conn = pool.acquire().await?;
            let committed = RankingRepository::new(&mut conn)
                .list_for_tournament(tournament_id)
                .await?;
            return Ok(Idempotent::Duplicate(committed));
        }
        return Err(classify_conflict(err, &[]));
    }

    tx.commit().await?;

    info!(
        %tournament_id,
        %session_id,
        appended,
        sessions = sessions.len(),
        participants = rankings.len(),
        "tournament finalized"
    );

    Ok(Idempotent::Applied(rankings))
}

pub async fn list_rankings(pool: &PgPool, tournament_id: Uuid) -> Result<Vec<Ranking>> {
    let mut conn = pool.acquire().await?;
    TournamentRepository::new(&mut conn)
        .find_by_id(tournament_id)
        .await?;
    RankingRepository::new(&mut conn)
        .list_for_tournament(tournament_id)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn participants(tournament_id: Uuid, n: usize) -> Vec<Participant> {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        (0..n)
            .map(|i| Participant {
                tournament_id,
                user_id: Uuid::from_u128(i as u128 + 1),
                participant_type: ParticipantType::Individual,
                enrolled_at: base + Duration::minutes(i as i64),
            })
            .collect()
    }

    fn line(user: &Participant, points: i32, outcome: RoundOutcome) -> ScoreLine {
        ScoreLine {
            user_id: user.user_id,
            participant_type: user.participant_type,
            points,
            outcome,
        }
    }

    fn session(tournament_id: Uuid, rounds: i32) -> TournamentSession {
        TournamentSession {
            session_id: Uuid::from_u128(99),
            tournament_id,
            rounds_configured: rounds,
        }
    }

    fn input(user: &Participant, round: i32, points: i32) -> RoundResultInput {
        RoundResultInput {
            round_number: round,
            user_id: user.user_id,
            participant_type: user.participant_type,
            points,
            outcome: RoundOutcome::Win,
        }
    }

    #[test]
    fn seven_participants_nine_results_give_dense_ranks() {
        let tid = Uuid::new_v4();
        let people = participants(tid, 7);
        let results = vec![
            line(&people[0], 3, RoundOutcome::Win),
            line(&people[1], 0, RoundOutcome::Loss),
            line(&people[2], 3, RoundOutcome::Win),
            line(&people[3], 1, RoundOutcome::Draw),
            line(&people[4], 1, RoundOutcome::Draw),
            line(&people[5], 0, RoundOutcome::Loss),
            line(&people[6], 3, RoundOutcome::Win),
            line(&people[0], 3, RoundOutcome::Win),
            line(&people[2], 0, RoundOutcome::Loss),
        ];

        let rankings = compute_standings(tid, &people, results).unwrap();

        assert_eq!(rankings.len(), 7);
        let ranks: Vec<i32> = rankings.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, (1..=7).collect::<Vec<_>>());
        let users: HashSet<Uuid> = rankings.iter().map(|r| r.user_id).collect();
        assert_eq!(users.len(), 7);

        assert_eq!(rankings[0].user_id, people[0].user_id);
        assert_eq!(rankings[0].points, 6);
        // 3 points with no loss beats 3 points with a loss
        assert_eq!(rankings[1].user_id, people[6].user_id);
        assert_eq!(rankings[2].user_id, people[2].user_id);
    }

    #[test]
    fn ties_fall_back_to_losses_then_enrollment_then_id() {
        let tid = Uuid::new_v4();
        let mut people = participants(tid, 4);
        // people[3] enrolled at the same instant as people[2]
        people[3].enrolled_at = people[2].enrolled_at;

        let results = vec![
            line(&people[0], 2, RoundOutcome::Loss),
            line(&people[1], 2, RoundOutcome::Win),
            line(&people[2], 2, RoundOutcome::Win),
            line(&people[3], 2, RoundOutcome::Win),
        ];

        let rankings = compute_standings(tid, &people, results).unwrap();
        let order: Vec<Uuid> = rankings.iter().map(|r| r.user_id).collect();

        assert_eq!(
            order,
            vec![
                people[1].user_id,
                people[2].user_id,
                people[3].user_id,
                people[0].user_id
            ]
        );
    }

    #[test]
    fn ordering_does_not_depend_on_input_order() {
        let tid = Uuid::new_v4();
        let people = participants(tid, 5);
        let results: Vec<ScoreLine> = people
            .iter()
            .enumerate()
            .map(|(i, p)| line(p, (i as i32 * 7) % 3, RoundOutcome::Draw))
            .collect();

        let forward = compute_standings(tid, &people, results.clone()).unwrap();
        let mut reversed_people = people.clone();
        reversed_people.reverse();
        let backward =
            compute_standings(tid, &reversed_people, results.into_iter().rev()).unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn participants_without_results_rank_last_with_zero_points() {
        let tid = Uuid::new_v4();
        let people = participants(tid, 3);
        let rankings =
            compute_standings(tid, &people, vec![line(&people[2], 5, RoundOutcome::Win)]).unwrap();

        assert_eq!(rankings[0].user_id, people[2].user_id);
        assert_eq!(rankings[1].points, 0);
        assert_eq!(rankings[2].points, 0);
        assert_eq!(rankings[1].user_id, people[0].user_id);
    }

    #[test]
    fn results_for_strangers_are_rejected() {
        let tid = Uuid::new_v4();
        let people = participants(tid, 2);
        let stranger = ScoreLine {
            user_id: Uuid::from_u128(777),
            participant_type: ParticipantType::Individual,
            points: 1,
            outcome: RoundOutcome::Win,
        };

        assert!(matches!(
            compute_standings(tid, &people, vec![stranger]),
            Err(StorageError::Validation(_))
        ));
    }

    #[test]
    fn empty_enrollment_is_insufficient_data() {
        assert!(matches!(
            compute_standings(Uuid::new_v4(), &[], Vec::new()),
            Err(StorageError::InsufficientData(_))
        ));
    }

    #[test]
    fn submission_validation_catches_bad_rounds_points_and_duplicates() {
        let tid = Uuid::new_v4();
        let people = participants(tid, 2);
        let session = session(tid, 3);

        assert!(validate_submission(&session, &people, &[input(&people[0], 1, 10)], 100).is_ok());
        assert!(validate_submission(&session, &people, &[], 100).is_err());
        assert!(validate_submission(&session, &people, &[input(&people[0], 4, 10)], 100).is_err());
        assert!(validate_submission(&session, &people, &[input(&people[0], 1, 101)], 100).is_err());
        assert!(validate_submission(&session, &people, &[input(&people[0], 1, -1)], 100).is_err());
        assert!(
            validate_submission(
                &session,
                &people,
                &[input(&people[0], 2, 1), input(&people[0], 2, 3)],
                100
            )
            .is_err()
        );

        let outsider = Participant {
            user_id: Uuid::from_u128(4242),
            ..people[0].clone()
        };
        assert!(validate_submission(&session, &people, &[input(&outsider, 1, 1)], 100).is_err());
    }

    #[test]
    fn missing_rounds_are_insufficient_data() {
        let tid = Uuid::new_v4();
        let session = session(tid, 3);

        let complete: BTreeSet<i32> = [1, 2, 3].into_iter().collect();
        assert!(ensure_rounds_complete(&session, &complete).is_ok());

        let partial: BTreeSet<i32> = [1, 3].into_iter().collect();
        match ensure_rounds_complete(&session, &partial) {
            Err(StorageError::InsufficientData(msg)) => assert!(msg.ends_with("round(s) 2")),
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    fn stored(session: &TournamentSession, user: &Participant, round: i32) -> RoundResult {
        RoundResult {
            result_id: 0,
            tournament_id: session.tournament_id,
            session_id: session.session_id,
            round_number: round,
            user_id: user.user_id,
            participant_type: user.participant_type,
            points: 1,
            outcome: RoundOutcome::Draw,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn every_session_must_be_complete() {
        let tid = Uuid::new_v4();
        let people = participants(tid, 1);
        let first = session(tid, 2);
        let second = TournamentSession {
            session_id: Uuid::from_u128(100),
            ..session(tid, 1)
        };
        let sessions = vec![first.clone(), second.clone()];

        let only_first = vec![stored(&first, &people[0], 1), stored(&first, &people[0], 2)];
        match ensure_sessions_complete(&sessions, &only_first) {
            Err(StorageError::InsufficientData(msg)) => {
                assert!(msg.contains(&second.session_id.to_string()))
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }

        let mut both = only_first;
        both.push(stored(&second, &people[0], 1));
        assert!(ensure_sessions_complete(&sessions, &both).is_ok());
    }
}
