use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::Result;
use crate::models::SkillRating;

pub struct SkillRatingRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> SkillRatingRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Current rating row, locked for the rest of the transaction.
    pub async fn lock(&mut self, user_id: Uuid, skill_name: &str) -> Result<Option<SkillRating>> {
        let rating = sqlx::query_as::<_, SkillRating>(
            r#"
            SELECT user_id, skill_name, rating, previous_ema, updates, updated_at
            FROM skill_ratings
            WHERE user_id = $1 AND skill_name = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(skill_name)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(rating)
    }

    pub async fn upsert(
        &mut self,
        user_id: Uuid,
        skill_name: &str,
        rating: f64,
        ema: f64,
    ) -> Result<SkillRating> {
        let stored = sqlx::query_as::<_, SkillRating>(
            r#"
            INSERT INTO skill_ratings (user_id, skill_name, rating, previous_ema, updates)
            VALUES ($1, $2, $3, $4, 1)
            ON CONFLICT (user_id, skill_name)
            DO UPDATE SET
                rating = EXCLUDED.rating,
                previous_ema = EXCLUDED.previous_ema,
                updates = skill_ratings.updates + 1,
                updated_at = NOW()
            RETURNING user_id, skill_name, rating, previous_ema, updates, updated_at
            "#,
        )
        .bind(user_id)
        .bind(skill_name)
        .bind(rating)
        .bind(ema)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(stored)
    }

    pub async fn list_for_user(&mut self, user_id: Uuid) -> Result<Vec<SkillRating>> {
        let ratings = sqlx::query_as::<_, SkillRating>(
            r#"
            SELECT user_id, skill_name, rating, previous_ema, updates, updated_at
            FROM skill_ratings
            WHERE user_id = $1
            ORDER BY skill_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(ratings)
    }
}
