//! Engine configuration: reward policy and skill weights.
//!
//! Loaded once at process start, validated, wrapped in an `Arc` and handed to
//! every operation by reference. Nothing in the crate mutates it afterwards.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, StorageError};

pub const RATING_FLOOR: f64 = 40.0;
pub const RATING_CEILING: f64 = 99.0;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EngineConfig {
    /// Free-form label so ledgers can be traced back to the policy that produced them.
    pub version: String,
    pub rewards: RewardPolicy,
    pub skills: SkillWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewardPolicy {
    pub tiers: Vec<RewardTier>,
}

/// Rewards for every rank in `min_rank..=max_rank`. A missing `max_rank` makes
/// the tier open-ended; only the last tier may be open-ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RewardTier {
    pub min_rank: i32,
    pub max_rank: Option<i32>,
    #[schema(value_type = String)]
    pub credits: Decimal,
    pub xp: i32,
    /// Base skill points per mapped skill, scaled by the skill's role weight.
    pub skill_points: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SkillWeights {
    pub dominant_weight: f64,
    pub supporting_weight: f64,
    /// EMA blend factor applied to each new delta.
    pub ema_alpha: f64,
    /// Delta granted to first place before role weighting; last place gets the negation.
    pub max_placement_delta: f64,
    pub initial_rating: f64,
    pub floor: f64,
    pub ceiling: f64,
    /// Upper bound accepted for points in a single round result.
    pub max_round_points: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "skill_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SkillRole {
    Dominant,
    Supporting,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: "builtin-1".to_string(),
            rewards: RewardPolicy::default(),
            skills: SkillWeights::default(),
        }
    }
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                RewardTier {
                    min_rank: 1,
                    max_rank: Some(1),
                    credits: Decimal::from(100),
                    xp: 50,
                    skill_points: 10,
                },
                RewardTier {
                    min_rank: 2,
                    max_rank: Some(4),
                    credits: Decimal::from(50),
                    xp: 25,
                    skill_points: 6,
                },
                RewardTier {
                    min_rank: 5,
                    max_rank: None,
                    credits: Decimal::from(10),
                    xp: 5,
                    skill_points: 2,
                },
            ],
        }
    }
}

impl Default for SkillWeights {
    fn default() -> Self {
        Self {
            dominant_weight: 1.0,
            supporting_weight: 0.5,
            ema_alpha: 0.3,
            max_placement_delta: 10.0,
            initial_rating: 60.0,
            floor: RATING_FLOOR,
            ceiling: RATING_CEILING,
            max_round_points: 1000,
        }
    }
}

impl EngineConfig {
    /// Reads a JSON policy file, or falls back to the built-in defaults when no
    /// path is given. The result is always validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    StorageError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_json(&raw)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| StorageError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.rewards.validate()?;
        self.skills.validate()
    }
}

impl RewardPolicy {
    pub fn tier_for(&self, rank: i32) -> Option<&RewardTier> {
        self.tiers.iter().find(|tier| tier.contains(rank))
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiers.is_empty() {
            return Err(StorageError::Config("reward policy has no tiers".into()));
        }

        let mut expected_min = 1;
        for (idx, tier) in self.tiers.iter().enumerate() {
            if tier.min_rank != expected_min {
                return Err(StorageError::Config(format!(
                    "tier {} starts at rank {}, expected {}",
                    idx + 1,
                    tier.min_rank,
                    expected_min
                )));
            }
            if tier.credits.is_sign_negative() || tier.xp < 0 || tier.skill_points < 0 {
                return Err(StorageError::Config(format!(
                    "tier {} has negative rewards",
                    idx + 1
                )));
            }
            match tier.max_rank {
                Some(max) if max < tier.min_rank => {
                    return Err(StorageError::Config(format!(
                        "tier {} ends before it starts",
                        idx + 1
                    )));
                }
                Some(max) => expected_min = max + 1,
                None if idx + 1 != self.tiers.len() => {
                    return Err(StorageError::Config(
                        "only the last tier may be open-ended".into(),
                    ));
                }
                None => {}
            }
        }

        Ok(())
    }
}

impl RewardTier {
    pub fn contains(&self, rank: i32) -> bool {
        rank >= self.min_rank && self.max_rank.is_none_or(|max| rank <= max)
    }
}

impl SkillWeights {
    pub fn weight(&self, role: SkillRole) -> f64 {
        match role {
            SkillRole::Dominant => self.dominant_weight,
            SkillRole::Supporting => self.supporting_weight,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.dominant_weight > 0.0 && self.supporting_weight > 0.0) {
            return Err(StorageError::Config("role weights must be positive".into()));
        }
        if self.supporting_weight > self.dominant_weight {
            return Err(StorageError::Config(
                "supporting weight must not exceed dominant weight".into(),
            ));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(StorageError::Config("ema_alpha must be in (0, 1]".into()));
        }
        if !(self.max_placement_delta.is_finite() && self.max_placement_delta > 0.0) {
            return Err(StorageError::Config(
                "max_placement_delta must be positive".into(),
            ));
        }
        if !(RATING_FLOOR <= self.floor
            && self.floor < self.initial_rating
            && self.initial_rating < self.ceiling
            && self.ceiling <= RATING_CEILING)
        {
            return Err(StorageError::Config(format!(
                "ratings must satisfy {RATING_FLOOR} <= floor < initial < ceiling <= {RATING_CEILING}"
            )));
        }
        if self.max_round_points < 1 {
            return Err(StorageError::Config("max_round_points must be >= 1".into()));
        }
        Ok(())
    }
}
