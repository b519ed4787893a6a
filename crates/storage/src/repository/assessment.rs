use sqlx::{PgConnection, QueryBuilder};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{AssessmentStatus, SkillAssessment};

const ASSESSMENT_COLUMNS: &str = r#"
    assessment_id, user_id, skill_name, score, status, requires_validation,
    assessed_by, assessed_at, validated_by, validated_at, archived_reason,
    previous_status, status_changed_at, status_changed_by
"#;

/// Name of the partial unique index guarding active assessments.
pub const ACTIVE_ASSESSMENT_INDEX: &str = "uq_skill_assessments_active";

pub struct NewAssessment<'a> {
    pub user_id: Uuid,
    pub skill_name: &'a str,
    pub score: i32,
    pub requires_validation: bool,
    pub assessed_by: &'a str,
}

pub struct AssessmentRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> AssessmentRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&mut self, id: Uuid) -> Result<SkillAssessment> {
        let sql = format!("SELECT {ASSESSMENT_COLUMNS} FROM skill_assessments WHERE assessment_id = $1");

        sqlx::query_as::<_, SkillAssessment>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or(StorageError::NotFound)
    }

    pub async fn lock(&mut self, id: Uuid) -> Result<SkillAssessment> {
        let sql = format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM skill_assessments WHERE assessment_id = $1 FOR UPDATE"
        );

        sqlx::query_as::<_, SkillAssessment>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or(StorageError::NotFound)
    }

    /// Active row for the key, locked. A row inserted by a concurrent creator
    /// after this read surfaces later as a unique violation on insert.
    pub async fn lock_active(
        &mut self,
        user_id: Uuid,
        skill_name: &str,
    ) -> Result<Option<SkillAssessment>> {
        let sql = format!(
            r#"
            SELECT {ASSESSMENT_COLUMNS}
            FROM skill_assessments
            WHERE user_id = $1 AND skill_name = $2 AND status IN ('ASSESSED', 'VALIDATED')
            FOR UPDATE
            "#
        );

        let active = sqlx::query_as::<_, SkillAssessment>(&sql)
            .bind(user_id)
            .bind(skill_name)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(active)
    }

    pub async fn insert(&mut self, new: &NewAssessment<'_>) -> Result<SkillAssessment> {
        let sql = format!(
            r#"
            INSERT INTO skill_assessments (
                assessment_id, user_id, skill_name, score, status, requires_validation,
                assessed_by, status_changed_by
            )
            VALUES ($1, $2, $3, $4, 'ASSESSED', $5, $6, $6)
            RETURNING {ASSESSMENT_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, SkillAssessment>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(new.skill_name)
            .bind(new.score)
            .bind(new.requires_validation)
            .bind(new.assessed_by)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(created)
    }

    /// Move a row to `to`, recording where it came from and who moved it.
    pub async fn set_status(
        &mut self,
        current: &SkillAssessment,
        to: AssessmentStatus,
        changed_by: &str,
        archived_reason: Option<&str>,
    ) -> Result<SkillAssessment> {
        let mut query = QueryBuilder::new("UPDATE skill_assessments SET status = ");
        query.push_bind(to);
        query.push(", previous_status = ");
        query.push_bind(current.status);
        query.push(", status_changed_at = NOW(), status_changed_by = ");
        query.push_bind(changed_by);

        if to == AssessmentStatus::Validated {
            query.push(", validated_by = ");
            query.push_bind(changed_by);
            query.push(", validated_at = NOW()");
        }
        if let Some(reason) = archived_reason {
            query.push(", archived_reason = ");
            query.push_bind(reason);
        }

        query.push(" WHERE assessment_id = ");
        query.push_bind(current.assessment_id);
        query.push(" AND status = ");
        query.push_bind(current.status);
        query.push(" RETURNING ");
        query.push(ASSESSMENT_COLUMNS);

        query
            .build_query_as::<SkillAssessment>()
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| {
                StorageError::ConcurrencyConflict(format!(
                    "assessment {} changed while being updated",
                    current.assessment_id
                ))
            })
    }

    /// History for a user, newest first, optionally narrowed to one skill.
    pub async fn list_for_user(
        &mut self,
        user_id: Uuid,
        skill_name: Option<&str>,
    ) -> Result<Vec<SkillAssessment>> {
        let mut query = QueryBuilder::new("SELECT ");
        query.push(ASSESSMENT_COLUMNS);
        query.push(" FROM skill_assessments WHERE user_id = ");
        query.push_bind(user_id);

        if let Some(skill) = skill_name {
            query.push(" AND skill_name = ");
            query.push_bind(skill);
        }

        query.push(" ORDER BY skill_name, assessed_at DESC");

        let rows = query
            .build_query_as::<SkillAssessment>()
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows)
    }
}
