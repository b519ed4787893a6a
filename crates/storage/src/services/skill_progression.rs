//! Skill ratings driven by tournament placement.
//!
//! Each update computes a raw delta from the placement, weights it by the
//! skill's role, blends it into an exponential moving average and adds the
//! average to the rating. The result is clamped to `[floor, ceiling]`, so no
//! sequence of placements can push a rating out of bounds.

use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::config::{SkillRole, SkillWeights};
use crate::error::{Result, StorageError};
use crate::models::SkillRating;
use crate::repository::SkillRatingRepository;

/// Final rank within a field of `field_size` participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    rank: i32,
    field_size: i32,
}

impl Placement {
    pub fn new(rank: i32, field_size: i32) -> Result<Self> {
        if field_size < 1 || rank < 1 || rank > field_size {
            return Err(StorageError::Validation(format!(
                "placement {rank} is outside a field of {field_size}"
            )));
        }
        Ok(Self { rank, field_size })
    }

    pub fn rank(&self) -> i32 {
        self.rank
    }

    pub fn field_size(&self) -> i32 {
        self.field_size
    }
}

/// Linear in rank: first place gets `+max_delta`, last place `-max_delta`.
/// A field of one counts as a win.
pub fn placement_to_delta(placement: Placement, max_delta: f64) -> f64 {
    if placement.field_size == 1 {
        return max_delta;
    }
    let spread = f64::from(placement.rank - 1) / f64::from(placement.field_size - 1);
    max_delta * (1.0 - 2.0 * spread)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingState {
    pub rating: f64,
    pub ema: f64,
}

impl RatingState {
    pub fn initial(weights: &SkillWeights) -> Self {
        Self {
            rating: weights.initial_rating,
            ema: 0.0,
        }
    }
}

impl From<&SkillRating> for RatingState {
    fn from(stored: &SkillRating) -> Self {
        Self {
            rating: stored.rating,
            ema: stored.previous_ema,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingChange {
    pub before: f64,
    pub after: f64,
    pub ema: f64,
}

/// Pure rating update rule over a fixed set of weights.
#[derive(Debug, Clone, Copy)]
pub struct SkillProgression<'a> {
    weights: &'a SkillWeights,
}

impl<'a> SkillProgression<'a> {
    pub fn new(weights: &'a SkillWeights) -> Self {
        Self { weights }
    }

    pub fn step(&self, state: RatingState, placement: Placement, role: SkillRole) -> RatingState {
        let w = self.weights;
        let raw = placement_to_delta(placement, w.max_placement_delta) * w.weight(role);
        let ema = w.ema_alpha * raw + (1.0 - w.ema_alpha) * state.ema;
        let rating = (state.rating + ema).clamp(w.floor, w.ceiling);

        RatingState { rating, ema }
    }

    /// Skill points shown in the ledger for a tier's base points under `role`.
    pub fn weighted_points(&self, base_points: i32, role: SkillRole) -> i32 {
        (f64::from(base_points) * self.weights.weight(role)).round() as i32
    }
}

/// Apply one placement to a user's rating inside the caller's transaction.
/// The rating row is locked first, so concurrent updates for the same user and
/// skill serialize.
pub async fn apply_skill_delta(
    conn: &mut PgConnection,
    weights: &SkillWeights,
    user_id: Uuid,
    skill_name: &str,
    placement: Placement,
    role: SkillRole,
) -> Result<RatingChange> {
    let mut repo = SkillRatingRepository::new(conn);

    let before = repo
        .lock(user_id, skill_name)
        .await?
        .as_ref()
        .map(RatingState::from)
        .unwrap_or_else(|| RatingState::initial(weights));

    let after = SkillProgression::new(weights).step(before, placement, role);
    repo.upsert(user_id, skill_name, after.rating, after.ema)
        .await?;

    debug!(
        %user_id,
        skill_name,
        rank = placement.rank,
        before = before.rating,
        after = after.rating,
        "skill rating updated"
    );

    Ok(RatingChange {
        before: before.rating,
        after: after.rating,
        ema: after.ema,
    })
}

pub async fn skill_ratings(pool: &PgPool, user_id: Uuid) -> Result<Vec<SkillRating>> {
    let mut conn = pool.acquire().await?;
    SkillRatingRepository::new(&mut conn)
        .list_for_user(user_id)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn weights() -> SkillWeights {
        EngineConfig::default().skills
    }

    fn place(rank: i32, field: i32) -> Placement {
        Placement::new(rank, field).unwrap()
    }

    #[test]
    fn placement_delta_is_linear_between_first_and_last() {
        assert_eq!(placement_to_delta(place(1, 5), 10.0), 10.0);
        assert_eq!(placement_to_delta(place(3, 5), 10.0), 0.0);
        assert_eq!(placement_to_delta(place(5, 5), 10.0), -10.0);
        assert_eq!(placement_to_delta(place(1, 1), 10.0), 10.0);
    }

    #[test]
    fn placements_outside_the_field_are_rejected() {
        assert!(Placement::new(0, 5).is_err());
        assert!(Placement::new(6, 5).is_err());
        assert!(Placement::new(1, 0).is_err());
    }

    #[test]
    fn first_update_from_initial_rating() {
        let w = weights();
        let progression = SkillProgression::new(&w);
        let next = progression.step(RatingState::initial(&w), place(1, 7), SkillRole::Dominant);

        // raw 10.0, ema 0.3 * 10.0
        assert!((next.ema - 3.0).abs() < 1e-9);
        assert!((next.rating - 63.0).abs() < 1e-9);
    }

    #[test]
    fn dominant_skills_move_further_than_supporting() {
        let w = weights();
        let progression = SkillProgression::new(&w);
        let start = RatingState::initial(&w);

        let dominant = progression.step(start, place(1, 4), SkillRole::Dominant);
        let supporting = progression.step(start, place(1, 4), SkillRole::Supporting);

        assert!(dominant.rating - start.rating > supporting.rating - start.rating);
        assert!(supporting.rating > start.rating);
    }

    #[test]
    fn ratings_stay_within_bounds_under_adversarial_sequences() {
        let w = weights();
        let progression = SkillProgression::new(&w);

        let mut state = RatingState::initial(&w);
        for _ in 0..500 {
            state = progression.step(state, place(1, 64), SkillRole::Dominant);
            assert!(state.rating <= w.ceiling);
        }
        assert_eq!(state.rating, w.ceiling);

        for _ in 0..500 {
            state = progression.step(state, place(64, 64), SkillRole::Dominant);
            assert!(state.rating >= w.floor);
        }
        assert_eq!(state.rating, w.floor);

        for i in 0..1000 {
            let rank = if i % 3 == 0 { 64 } else { 1 };
            state = progression.step(state, place(rank, 64), SkillRole::Supporting);
            assert!((w.floor..=w.ceiling).contains(&state.rating));
        }
    }

    #[test]
    fn identical_inputs_give_identical_ratings() {
        let w = weights();
        let progression = SkillProgression::new(&w);
        let run = || {
            [(2, 9), (9, 9), (1, 9), (5, 9), (3, 9)]
                .into_iter()
                .fold(RatingState::initial(&w), |state, (rank, field)| {
                    progression.step(state, place(rank, field), SkillRole::Dominant)
                })
        };

        let first = run();
        let second = run();
        assert_eq!(first.rating.to_bits(), second.rating.to_bits());
        assert_eq!(first.ema.to_bits(), second.ema.to_bits());
    }

    #[test]
    fn weighted_points_round_to_nearest() {
        let w = weights();
        let progression = SkillProgression::new(&w);
        assert_eq!(progression.weighted_points(10, SkillRole::Dominant), 10);
        assert_eq!(progression.weighted_points(5, SkillRole::Supporting), 3);
        assert_eq!(progression.weighted_points(2, SkillRole::Supporting), 1);
    }
}
