//! Reward distribution for a completed tournament.
//!
//! The whole payout runs in one transaction holding the tournament row lock:
//! credit, XP and skill-reward rows for every ranked participant, rating
//! updates for every mapped skill, then `rewards_distributed_at` together with
//! the move to `REWARDS_DISTRIBUTED`. Either all of it commits or none of it
//! does. A second call finds the stamp and returns the recorded ledger.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::Idempotent;
use crate::config::{EngineConfig, RewardPolicy, SkillRole, SkillWeights};
use crate::dto::reward::RewardSummary;
use crate::error::{EntityKind, Result, StorageError};
use crate::ledger::{LedgerKey, LedgerWriter, RewardSource, SkillRewardEntry};
use crate::models::{Ranking, SkillMapping, TournamentStatus};
use crate::repository::{RankingRepository, TournamentRepository};
use crate::services::skill_progression::{Placement, SkillProgression, apply_skill_delta};

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSkill {
    pub skill_name: String,
    pub role: SkillRole,
    pub points: i32,
}

/// Everything one ranked participant is owed.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedReward {
    pub user_id: Uuid,
    pub placement: Placement,
    pub credits: Decimal,
    pub xp: i32,
    pub skills: Vec<PlannedSkill>,
}

/// Turn rankings into payouts. Ranks not covered by any tier get zero-amount
/// rows so every participant still shows up in the ledger.
pub fn plan_rewards(
    policy: &RewardPolicy,
    weights: &SkillWeights,
    rankings: &[Ranking],
    mappings: &[SkillMapping],
) -> Result<Vec<PlannedReward>> {
    let field_size = rankings.len() as i32;
    let progression = SkillProgression::new(weights);

    rankings
        .iter()
        .map(|ranking| {
            let placement = Placement::new(ranking.rank, field_size)?;
            let (credits, xp, base_points) = policy
                .tier_for(ranking.rank)
                .map(|tier| (tier.credits, tier.xp, tier.skill_points))
                .unwrap_or((Decimal::ZERO, 0, 0));

            let skills = mappings
                .iter()
                .map(|mapping| PlannedSkill {
                    skill_name: mapping.skill_name.clone(),
                    role: mapping.role,
                    points: progression.weighted_points(base_points, mapping.role),
                })
                .collect();

            Ok(PlannedReward {
                user_id: ranking.user_id,
                placement,
                credits,
                xp,
                skills,
            })
        })
        .collect()
}

fn describe(tournament_name: &str, rank: i32) -> String {
    format!("{tournament_name}: finished #{rank}")
}

/// Pay out a completed tournament exactly once.
#[instrument(skip(pool, config, ledger))]
pub async fn distribute_rewards(
    pool: &PgPool,
    config: &EngineConfig,
    ledger: &dyn LedgerWriter,
    tournament_id: Uuid,
    actor: &str,
) -> Result<Idempotent<RewardSummary>> {
    let mut tx = pool.begin().await?;

    let tournament = TournamentRepository::new(&mut tx).lock(tournament_id).await?;

    if tournament.rewards_distributed_at.is_some() {
        let entries = ledger
            .entries_for_source(&mut tx, RewardSource::Tournament, tournament_id)
            .await?;
        tx.commit().await?;
        debug!(%tournament_id, rows = entries.row_count(), "rewards already distributed");
        return Ok(Idempotent::Duplicate(RewardSummary::from_ledger(
            tournament_id,
            &entries,
        )));
    }

    if tournament.status != TournamentStatus::Completed {
        return Err(StorageError::invalid_transition(
            EntityKind::Tournament,
            tournament_id,
            tournament.status,
            TournamentStatus::RewardsDistributed,
        ));
    }

    let rankings = RankingRepository::new(&mut tx)
        .list_for_tournament(tournament_id)
        .await?;
    if rankings.is_empty() {
        return Err(StorageError::InsufficientData(format!(
            "tournament {tournament_id} has no rankings to reward"
        )));
    }
    let mappings = TournamentRepository::new(&mut tx)
        .skill_mappings(tournament_id)
        .await?;

    let plan = plan_rewards(&config.rewards, &config.skills, &rankings, &mappings)?;

    for reward in &plan {
        let key = LedgerKey::tournament(reward.user_id, tournament_id);
        let description = describe(&tournament.name, reward.placement.rank());

        ledger
            .record_credit(&mut tx, key, reward.credits, &description)
            .await?;
        ledger
            .record_xp(&mut tx, key, reward.xp, &description)
            .await?;

        for skill in &reward.skills {
            if ledger
                .find_skill_reward(&mut tx, key, &skill.skill_name)
                .await?
                .is_some()
            {
                continue;
            }

            let change = apply_skill_delta(
                &mut tx,
                &config.skills,
                reward.user_id,
                &skill.skill_name,
                reward.placement,
                skill.role,
            )
            .await?;

            ledger
                .record_skill_reward(
                    &mut tx,
                    key,
                    SkillRewardEntry {
                        skill_name: skill.skill_name.clone(),
                        points: skill.points,
                        rating_before: change.before,
                        rating_after: change.after,
                    },
                )
                .await?;
        }
    }

    TournamentRepository::new(&mut tx)
        .mark_rewards_distributed(tournament_id, actor)
        .await?;

    let entries = ledger
        .entries_for_source(&mut tx, RewardSource::Tournament, tournament_id)
        .await?;
    tx.commit().await?;

    let summary = RewardSummary::from_ledger(tournament_id, &entries);
    info!(
        %tournament_id,
        users = summary.users.len(),
        credits = %summary.total_credits(),
        xp = summary.total_xp(),
        policy = %config.version,
        "rewards distributed"
    );

    Ok(Idempotent::Applied(summary))
}

/// What a tournament paid out so far. Empty until rewards are distributed.
pub async fn reward_summary(
    pool: &PgPool,
    ledger: &dyn LedgerWriter,
    tournament_id: Uuid,
) -> Result<RewardSummary> {
    let mut conn = pool.acquire().await?;
    TournamentRepository::new(&mut conn)
        .find_by_id(tournament_id)
        .await?;
    let entries = ledger
        .entries_for_source(&mut conn, RewardSource::Tournament, tournament_id)
        .await?;

    Ok(RewardSummary::from_ledger(tournament_id, &entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::reward::SkillDelta;
    use crate::models::ParticipantType;
    use crate::services::skill_progression::RatingState;

    fn rankings(n: i32) -> Vec<Ranking> {
        let tournament_id = Uuid::from_u128(1);
        (1..=n)
            .map(|rank| Ranking {
                tournament_id,
                user_id: Uuid::from_u128(100 + rank as u128),
                participant_type: ParticipantType::Individual,
                rank,
                points: i64::from(10 * (n - rank)),
                losses: 0,
            })
            .collect()
    }

    fn mapping(skill_name: &str, role: SkillRole) -> SkillMapping {
        SkillMapping {
            tournament_id: Uuid::from_u128(1),
            skill_name: skill_name.to_string(),
            role,
        }
    }

    #[test]
    fn seven_ranked_users_follow_the_default_tiers() {
        let config = EngineConfig::default();
        let plan = plan_rewards(&config.rewards, &config.skills, &rankings(7), &[]).unwrap();

        assert_eq!(plan.len(), 7);
        let credits: Decimal = plan.iter().map(|p| p.credits).sum();
        let xp: i32 = plan.iter().map(|p| p.xp).sum();
        assert_eq!(credits, Decimal::from(280));
        assert_eq!(xp, 140);

        assert_eq!(plan[0].credits, Decimal::from(100));
        assert_eq!(plan[3].xp, 25);
        assert_eq!(plan[6].credits, Decimal::from(10));
    }

    #[test]
    fn every_mapped_skill_is_planned_with_role_weighted_points() {
        let config = EngineConfig::default();
        let mappings = vec![
            mapping("navigation", SkillRole::Dominant),
            mapping("rope_work", SkillRole::Supporting),
        ];
        let plan = plan_rewards(&config.rewards, &config.skills, &rankings(3), &mappings).unwrap();

        let winner = &plan[0];
        assert_eq!(winner.skills.len(), 2);
        assert_eq!(winner.skills[0].points, 10);
        assert_eq!(winner.skills[1].points, 5);
        assert_eq!(plan[2].skills[0].points, 6);
    }

    #[test]
    fn skill_points_are_the_award_not_the_rating_move() {
        let config = EngineConfig::default();
        let mappings = vec![mapping("navigation", SkillRole::Dominant)];
        let plan = plan_rewards(&config.rewards, &config.skills, &rankings(3), &mappings).unwrap();

        let last = &plan[2];
        assert_eq!(last.skills[0].points, 6);

        let progression = SkillProgression::new(&config.skills);
        let start = RatingState::initial(&config.skills);
        let after = progression.step(start, last.placement, SkillRole::Dominant);
        let delta = SkillDelta {
            skill_name: "navigation".into(),
            points: last.skills[0].points,
            rating_before: start.rating,
            rating_after: after.rating,
        };

        assert!(delta.points > 0);
        assert!(delta.rating_change() < 0.0);
    }

    #[test]
    fn ranks_outside_a_bounded_policy_get_zero_rows() {
        let mut config = EngineConfig::default();
        config.rewards.tiers.truncate(2);

        let plan = plan_rewards(&config.rewards, &config.skills, &rankings(6), &[]).unwrap();

        assert_eq!(plan.len(), 6);
        assert_eq!(plan[4].credits, Decimal::ZERO);
        assert_eq!(plan[5].xp, 0);
    }

    #[test]
    fn placements_carry_the_field_size() {
        let config = EngineConfig::default();
        let plan = plan_rewards(&config.rewards, &config.skills, &rankings(4), &[]).unwrap();

        assert!(plan.iter().all(|p| p.placement.field_size() == 4));
        assert_eq!(plan[3].placement.rank(), 4);
    }

    #[test]
    fn descriptions_name_tournament_and_rank() {
        assert_eq!(describe("Spring Cup", 2), "Spring Cup: finished #2");
    }
}
