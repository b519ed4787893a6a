use sqlx::{PgConnection, QueryBuilder};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{SpecializationProgress, UserLicense};

pub struct ProgressRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> ProgressRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    pub async fn list_progress(
        &mut self,
        specialization: Option<&str>,
    ) -> Result<Vec<SpecializationProgress>> {
        let mut query = QueryBuilder::new(
            "SELECT user_id, specialization, current_level, updated_at FROM specialization_progress WHERE 1=1",
        );

        if let Some(spec) = specialization {
            query.push(" AND specialization = ");
            query.push_bind(spec);
        }

        query.push(" ORDER BY user_id, specialization");

        let rows = query
            .build_query_as::<SpecializationProgress>()
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows)
    }

    pub async fn list_active_licenses(
        &mut self,
        specialization: Option<&str>,
    ) -> Result<Vec<UserLicense>> {
        let mut query = QueryBuilder::new(
            r#"
            SELECT license_id, user_id, specialization, license_level, is_active, issued_at, updated_at
            FROM user_licenses
            WHERE is_active
            "#,
        );

        if let Some(spec) = specialization {
            query.push(" AND specialization = ");
            query.push_bind(spec);
        }

        query.push(" ORDER BY user_id, specialization");

        let rows = query
            .build_query_as::<UserLicense>()
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows)
    }

    pub async fn lock_user_progress(&mut self, user_id: Uuid) -> Result<Vec<SpecializationProgress>> {
        let rows = sqlx::query_as::<_, SpecializationProgress>(
            r#"
            SELECT user_id, specialization, current_level, updated_at
            FROM specialization_progress
            WHERE user_id = $1
            ORDER BY specialization
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    pub async fn lock_user_licenses(&mut self, user_id: Uuid) -> Result<Vec<UserLicense>> {
        let rows = sqlx::query_as::<_, UserLicense>(
            r#"
            SELECT license_id, user_id, specialization, license_level, is_active, issued_at, updated_at
            FROM user_licenses
            WHERE user_id = $1 AND is_active
            ORDER BY specialization
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    pub async fn upsert_progress(
        &mut self,
        user_id: Uuid,
        specialization: &str,
        level: i32,
    ) -> Result<SpecializationProgress> {
        let row = sqlx::query_as::<_, SpecializationProgress>(
            r#"
            INSERT INTO specialization_progress (user_id, specialization, current_level)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, specialization)
            DO UPDATE SET current_level = EXCLUDED.current_level, updated_at = NOW()
            RETURNING user_id, specialization, current_level, updated_at
            "#,
        )
        .bind(user_id)
        .bind(specialization)
        .bind(level)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(row)
    }

    pub async fn set_license_level(&mut self, license_id: Uuid, level: i32) -> Result<UserLicense> {
        let row = sqlx::query_as::<_, UserLicense>(
            r#"
            UPDATE user_licenses
            SET license_level = $2, updated_at = NOW()
            WHERE license_id = $1
            RETURNING license_id, user_id, specialization, license_level, is_active, issued_at, updated_at
            "#,
        )
        .bind(license_id)
        .bind(level)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(row)
    }

    /// Issue a license; a concurrent issuer for the same key leaves the existing row in place.
    pub async fn issue_license(
        &mut self,
        user_id: Uuid,
        specialization: &str,
        level: i32,
    ) -> Result<Option<UserLicense>> {
        let row = sqlx::query_as::<_, UserLicense>(
            r#"
            INSERT INTO user_licenses (license_id, user_id, specialization, license_level)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, specialization) WHERE is_active DO NOTHING
            RETURNING license_id, user_id, specialization, license_level, is_active, issued_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(specialization)
        .bind(level)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(row)
    }
}
