use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::ledger::LedgerEntries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkillDelta {
    pub skill_name: String,
    /// Policy award; not the rating movement.
    pub points: i32,
    pub rating_before: f64,
    pub rating_after: f64,
}

impl SkillDelta {
    pub fn rating_change(&self) -> f64 {
        self.rating_after - self.rating_before
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserReward {
    pub user_id: Uuid,
    #[schema(value_type = String)]
    pub credits_awarded: Decimal,
    pub xp_awarded: i32,
    pub skill_deltas: Vec<SkillDelta>,
}

/// What a tournament paid out, per user. Always rebuilt from the ledger, so a
/// replayed distribution reports exactly what the first one wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RewardSummary {
    pub tournament_id: Uuid,
    pub users: Vec<UserReward>,
}

impl RewardSummary {
    pub fn from_ledger(tournament_id: Uuid, entries: &LedgerEntries) -> Self {
        let mut users: BTreeMap<Uuid, UserReward> = BTreeMap::new();

        let slot = |user_id: Uuid| UserReward {
            user_id,
            credits_awarded: Decimal::ZERO,
            xp_awarded: 0,
            skill_deltas: Vec::new(),
        };

        for credit in &entries.credits {
            users
                .entry(credit.user_id)
                .or_insert_with(|| slot(credit.user_id))
                .credits_awarded += credit.amount;
        }
        for xp in &entries.xp {
            users
                .entry(xp.user_id)
                .or_insert_with(|| slot(xp.user_id))
                .xp_awarded += xp.amount;
        }
        for reward in &entries.skills {
            users
                .entry(reward.user_id)
                .or_insert_with(|| slot(reward.user_id))
                .skill_deltas
                .push(SkillDelta {
                    skill_name: reward.skill_name.clone(),
                    points: reward.points,
                    rating_before: reward.rating_before,
                    rating_after: reward.rating_after,
                });
        }

        let users = users
            .into_values()
            .map(|mut user| {
                user.skill_deltas
                    .sort_by(|a, b| a.skill_name.cmp(&b.skill_name));
                user
            })
            .collect();

        Self {
            tournament_id,
            users,
        }
    }

    pub fn total_credits(&self) -> Decimal {
        self.users.iter().map(|u| u.credits_awarded).sum()
    }

    pub fn total_xp(&self) -> i64 {
        self.users.iter().map(|u| i64::from(u.xp_awarded)).sum()
    }

    pub fn for_user(&self, user_id: Uuid) -> Option<&UserReward> {
        self.users.iter().find(|u| u.user_id == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DistributeRewardsRequest {
    #[validate(length(min = 1, max = 255, message = "actor must be between 1 and 255 characters"))]
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DistributionResponse {
    /// False when rewards had already been distributed by an earlier call.
    pub distributed_now: bool,
    pub total_credits: String,
    pub total_xp: i64,
    pub summary: RewardSummary,
}

impl DistributionResponse {
    pub fn new(distributed_now: bool, summary: RewardSummary) -> Self {
        Self {
            distributed_now,
            total_credits: summary.total_credits().to_string(),
            total_xp: summary.total_xp(),
            summary,
        }
    }
}
