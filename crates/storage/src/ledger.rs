//! Reward ledger: credit, XP and skill-reward rows.
//!
//! `PgLedgerWriter` is the only code that inserts into the ledger tables. The
//! row types carry a private marker field, so they can be read from the
//! database or serialized but never built by hand outside this module.
//! Every insert is preceded by a lookup on the idempotency key
//! `(user_id, source_type, source_id[, skill_name])` and backed by the matching
//! unique constraint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::Idempotent;
use crate::error::{Result, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reward_source", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RewardSource {
    Tournament,
}

/// Natural key shared by every ledger table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub user_id: Uuid,
    pub source_type: RewardSource,
    pub source_id: Uuid,
}

impl LedgerKey {
    pub fn tournament(user_id: Uuid, tournament_id: Uuid) -> Self {
        Self {
            user_id,
            source_type: RewardSource::Tournament,
            source_id: tournament_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Sealed;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CreditTransaction {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub source_type: RewardSource,
    pub source_id: Uuid,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip)]
    _sealed: Sealed,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct XpTransaction {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub source_type: RewardSource,
    pub source_id: Uuid,
    pub amount: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip)]
    _sealed: Sealed,
}

/// One skill's entry for one reward event. The two figures are independent:
/// `points` is the policy award (tier skill points times the role weight),
/// while `rating_after - rating_before` is the rating change the placement
/// caused, which can be negative even when `points` is positive.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct SkillReward {
    pub reward_id: Uuid,
    pub user_id: Uuid,
    pub source_type: RewardSource,
    pub source_id: Uuid,
    pub skill_name: String,
    pub points: i32,
    pub rating_before: f64,
    pub rating_after: f64,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip)]
    _sealed: Sealed,
}

/// What the caller wants recorded for one skill.
#[derive(Debug, Clone)]
pub struct SkillRewardEntry {
    pub skill_name: String,
    pub points: i32,
    pub rating_before: f64,
    pub rating_after: f64,
}

/// All ledger rows written for one source.
#[derive(Debug, Clone, Default)]
pub struct LedgerEntries {
    pub credits: Vec<CreditTransaction>,
    pub xp: Vec<XpTransaction>,
    pub skills: Vec<SkillReward>,
}

impl LedgerEntries {
    pub fn row_count(&self) -> usize {
        self.credits.len() + self.xp.len() + self.skills.len()
    }
}

#[async_trait]
pub trait LedgerWriter: Send + Sync {
    async fn record_credit(
        &self,
        conn: &mut PgConnection,
        key: LedgerKey,
        amount: Decimal,
        description: &str,
    ) -> Result<Idempotent<CreditTransaction>>;

    async fn record_xp(
        &self,
        conn: &mut PgConnection,
        key: LedgerKey,
        amount: i32,
        description: &str,
    ) -> Result<Idempotent<XpTransaction>>;

    async fn find_skill_reward(
        &self,
        conn: &mut PgConnection,
        key: LedgerKey,
        skill_name: &str,
    ) -> Result<Option<SkillReward>>;

    async fn record_skill_reward(
        &self,
        conn: &mut PgConnection,
        key: LedgerKey,
        entry: SkillRewardEntry,
    ) -> Result<Idempotent<SkillReward>>;

    async fn entries_for_source(
        &self,
        conn: &mut PgConnection,
        source_type: RewardSource,
        source_id: Uuid,
    ) -> Result<LedgerEntries>;
}

/// Postgres-backed ledger writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgLedgerWriter;

impl PgLedgerWriter {
    async fn find_credit(
        conn: &mut PgConnection,
        key: LedgerKey,
    ) -> Result<Option<CreditTransaction>> {
        let row = sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT transaction_id, user_id, source_type, source_id, amount, description, created_at
            FROM credit_transactions
            WHERE user_id = $1 AND source_type = $2 AND source_id = $3
            "#,
        )
        .bind(key.user_id)
        .bind(key.source_type)
        .bind(key.source_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row)
    }

    async fn find_xp(conn: &mut PgConnection, key: LedgerKey) -> Result<Option<XpTransaction>> {
        let row = sqlx::query_as::<_, XpTransaction>(
            r#"
            SELECT transaction_id, user_id, source_type, source_id, amount, description, created_at
            FROM xp_transactions
            WHERE user_id = $1 AND source_type = $2 AND source_id = $3
            "#,
        )
        .bind(key.user_id)
        .bind(key.source_type)
        .bind(key.source_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl LedgerWriter for PgLedgerWriter {
    async fn record_credit(
        &self,
        conn: &mut PgConnection,
        key: LedgerKey,
        amount: Decimal,
        description: &str,
    ) -> Result<Idempotent<CreditTransaction>> {
        if let Some(existing) = Self::find_credit(conn, key).await? {
            debug!(user_id = %key.user_id, source_id = %key.source_id, "credit already recorded");
            return Ok(Idempotent::Duplicate(existing));
        }

        let inserted = sqlx::query_as::<_, CreditTransaction>(
            r#"
            INSERT INTO credit_transactions (transaction_id, user_id, source_type, source_id, amount, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, source_type, source_id) DO NOTHING
            RETURNING transaction_id, user_id, source_type, source_id, amount, description, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key.user_id)
        .bind(key.source_type)
        .bind(key.source_id)
        .bind(amount)
        .bind(description)
        .fetch_optional(&mut *conn)
        .await?;

        match inserted {
            Some(row) => Ok(Idempotent::Applied(row)),
            None => Self::find_credit(conn, key)
                .await?
                .map(Idempotent::Duplicate)
                .ok_or(StorageError::NotFound),
        }
    }

    async fn record_xp(
        &self,
        conn: &mut PgConnection,
        key: LedgerKey,
        amount: i32,
        description: &str,
    ) -> Result<Idempotent<XpTransaction>> {
        if let Some(existing) = Self::find_xp(conn, key).await? {
            debug!(user_id = %key.user_id, source_id = %key.source_id, "xp already recorded");
            return Ok(Idempotent::Duplicate(existing));
        }

        let inserted = sqlx::query_as::<_, XpTransaction>(
            r#"
            INSERT INTO xp_transactions (transaction_id, user_id, source_type, source_id, amount, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, source_type, source_id) DO NOTHING
            RETURNING transaction_id, user_id, source_type, source_id, amount, description, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key.user_id)
        .bind(key.source_type)
        .bind(key.source_id)
        .bind(amount)
        .bind(description)
        .fetch_optional(&mut *conn)
        .await?;

        match inserted {
            Some(row) => Ok(Idempotent::Applied(row)),
            None => Self::find_xp(conn, key)
                .await?
                .map(Idempotent::Duplicate)
                .ok_or(StorageError::NotFound),
        }
    }

    async fn find_skill_reward(
        &self,
        conn: &mut PgConnection,
        key: LedgerKey,
        skill_name: &str,
    ) -> Result<Option<SkillReward>> {
        let row = sqlx::query_as::<_, SkillReward>(
            r#"
            SELECT reward_id, user_id, source_type, source_id, skill_name, points,
                   rating_before, rating_after, created_at
            FROM skill_rewards
            WHERE user_id = $1 AND source_type = $2 AND source_id = $3 AND skill_name = $4
            "#,
        )
        .bind(key.user_id)
        .bind(key.source_type)
        .bind(key.source_id)
        .bind(skill_name)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row)
    }

    async fn record_skill_reward(
        &self,
        conn: &mut PgConnection,
        key: LedgerKey,
        entry: SkillRewardEntry,
    ) -> Result<Idempotent<SkillReward>> {
        if let Some(existing) = self.find_skill_reward(conn, key, &entry.skill_name).await? {
            debug!(
                user_id = %key.user_id,
                skill = %entry.skill_name,
                "skill reward already recorded"
            );
            return Ok(Idempotent::Duplicate(existing));
        }

        let inserted = sqlx::query_as::<_, SkillReward>(
            r#"
            INSERT INTO skill_rewards (
                reward_id, user_id, source_type, source_id, skill_name,
                points, rating_before, rating_after
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, source_type, source_id, skill_name) DO NOTHING
            RETURNING reward_id, user_id, source_type, source_id, skill_name, points,
                      rating_before, rating_after, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key.user_id)
        .bind(key.source_type)
        .bind(key.source_id)
        .bind(&entry.skill_name)
        .bind(entry.points)
        .bind(entry.rating_before)
        .bind(entry.rating_after)
        .fetch_optional(&mut *conn)
        .await?;

        match inserted {
            Some(row) => Ok(Idempotent::Applied(row)),
            None => self
                .find_skill_reward(conn, key, &entry.skill_name)
                .await?
                .map(Idempotent::Duplicate)
                .ok_or(StorageError::NotFound),
        }
    }

    async fn entries_for_source(
        &self,
        conn: &mut PgConnection,
        source_type: RewardSource,
        source_id: Uuid,
    ) -> Result<LedgerEntries> {
        let credits = sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT transaction_id, user_id, source_type, source_id, amount, description, created_at
            FROM credit_transactions
            WHERE source_type = $1 AND source_id = $2
            ORDER BY user_id
            "#,
        )
        .bind(source_type)
        .bind(source_id)
        .fetch_all(&mut *conn)
        .await?;

        let xp = sqlx::query_as::<_, XpTransaction>(
            r#"
            SELECT transaction_id, user_id, source_type, source_id, amount, description, created_at
            FROM xp_transactions
            WHERE source_type = $1 AND source_id = $2
            ORDER BY user_id
            "#,
        )
        .bind(source_type)
        .bind(source_id)
        .fetch_all(&mut *conn)
        .await?;

        let skills = sqlx::query_as::<_, SkillReward>(
            r#"
            SELECT reward_id, user_id, source_type, source_id, skill_name, points,
                   rating_before, rating_after, created_at
            FROM skill_rewards
            WHERE source_type = $1 AND source_id = $2
            ORDER BY user_id, skill_name
            "#,
        )
        .bind(source_type)
        .bind(source_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(LedgerEntries {
            credits,
            xp,
            skills,
        })
    }
}
