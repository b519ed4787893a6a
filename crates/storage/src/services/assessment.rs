//! Instructor-submitted skill assessments.
//!
//! ```text
//! NOT_ASSESSED -> ASSESSED -> VALIDATED -> ARCHIVED
//!                     \________________________^
//! ```
//!
//! At most one row per `(user, skill)` is active (`ASSESSED` or `VALIDATED`).
//! Creating a new assessment archives the active one in the same transaction.

use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::Idempotent;
use crate::dto::assessment::{
    ArchiveAssessmentRequest, CreateAssessmentRequest, ValidateAssessmentRequest,
};
use crate::error::{EntityKind, Result, StorageError, classify_conflict};
use crate::models::{AssessmentStatus, SkillAssessment};
use crate::repository::AssessmentRepository;
use crate::repository::assessment::{ACTIVE_ASSESSMENT_INDEX, NewAssessment};

pub const MAX_CREATE_ATTEMPTS: usize = 3;

pub const SUPERSEDED_REASON: &str = "superseded by new assessment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentStep {
    /// Already in the requested state.
    Stay,
    Move,
}

pub fn assessment_step(from: AssessmentStatus, to: AssessmentStatus) -> Option<AssessmentStep> {
    use AssessmentStatus::*;

    match (from, to) {
        (a, b) if a == b => Some(AssessmentStep::Stay),
        (NotAssessed, Assessed)
        | (Assessed, Validated)
        | (Assessed, Archived)
        | (Validated, Archived) => Some(AssessmentStep::Move),
        _ => None,
    }
}

fn check_step(
    assessment: &SkillAssessment,
    to: AssessmentStatus,
) -> Result<AssessmentStep> {
    assessment_step(assessment.status, to).ok_or_else(|| {
        StorageError::invalid_transition(
            EntityKind::Assessment,
            assessment.assessment_id,
            assessment.status,
            to,
        )
    })
}

fn is_resubmission(active: &SkillAssessment, request: &CreateAssessmentRequest) -> bool {
    active.score == request.score
        && active.assessed_by == request.assessed_by
        && active.requires_validation == request.requires_validation
}

async fn try_create(
    conn: &mut PgConnection,
    request: &CreateAssessmentRequest,
) -> Result<Idempotent<SkillAssessment>> {
    let mut repo = AssessmentRepository::new(conn);

    if let Some(active) = repo.lock_active(request.user_id, &request.skill_name).await? {
        if is_resubmission(&active, request) {
            return Ok(Idempotent::Duplicate(active));
        }

        check_step(&active, AssessmentStatus::Archived)?;
        repo.set_status(
            &active,
            AssessmentStatus::Archived,
            &request.assessed_by,
            Some(SUPERSEDED_REASON),
        )
        .await?;
        debug!(assessment_id = %active.assessment_id, "archived superseded assessment");
    }

    let created = repo
        .insert(&NewAssessment {
            user_id: request.user_id,
            skill_name: &request.skill_name,
            score: request.score,
            requires_validation: request.requires_validation,
            assessed_by: &request.assessed_by,
        })
        .await?;

    Ok(Idempotent::Applied(created))
}

/// Record a new assessment, archiving whatever was active for the same user
/// and skill. A concurrent creator that wins the active-row index makes this
/// call retry against the winner's row.
#[instrument(skip(pool, request), fields(user_id = %request.user_id, skill = %request.skill_name))]
pub async fn create_assessment(
    pool: &PgPool,
    request: &CreateAssessmentRequest,
) -> Result<Idempotent<SkillAssessment>> {
    request.validate()?;

    for attempt in 1..=MAX_CREATE_ATTEMPTS {
        let mut tx = pool.begin().await?;

        match try_create(&mut tx, request).await {
            Ok(outcome) => {
                tx.commit().await?;
                if let Idempotent::Applied(created) = &outcome {
                    info!(assessment_id = %created.assessment_id, score = created.score, "assessment created");
                }
                return Ok(outcome);
            }
            Err(err) if err.violates(ACTIVE_ASSESSMENT_INDEX) || err.is_transient() => {
                tx.rollback().await?;
                debug!(attempt, "active assessment changed concurrently, retrying");
            }
            Err(err) => return Err(classify_conflict(err, &[])),
        }
    }

    warn!(
        attempts = MAX_CREATE_ATTEMPTS,
        "gave up creating assessment under contention"
    );
    Err(StorageError::ConcurrencyConflict(format!(
        "assessment for user {} skill {} kept changing",
        request.user_id, request.skill_name
    )))
}

async fn move_assessment(
    pool: &PgPool,
    assessment_id: Uuid,
    to: AssessmentStatus,
    changed_by: &str,
    reason: Option<&str>,
) -> Result<Idempotent<SkillAssessment>> {
    let mut tx = pool.begin().await?;
    let mut repo = AssessmentRepository::new(&mut tx);

    let current = repo.lock(assessment_id).await?;
    if check_step(&current, to)? == AssessmentStep::Stay {
        tx.commit().await?;
        return Ok(Idempotent::Duplicate(current));
    }

    let updated = repo.set_status(&current, to, changed_by, reason).await?;
    tx.commit().await?;

    info!(%assessment_id, from = %current.status, %to, changed_by, "assessment transitioned");

    Ok(Idempotent::Applied(updated))
}

/// `ASSESSED -> VALIDATED`. Whether the validator may validate is the caller's call.
#[instrument(skip(pool, request))]
pub async fn validate_assessment(
    pool: &PgPool,
    assessment_id: Uuid,
    request: &ValidateAssessmentRequest,
) -> Result<Idempotent<SkillAssessment>> {
    request.validate()?;
    move_assessment(
        pool,
        assessment_id,
        AssessmentStatus::Validated,
        &request.validated_by,
        None,
    )
    .await
}

#[instrument(skip(pool, request))]
pub async fn archive_assessment(
    pool: &PgPool,
    assessment_id: Uuid,
    request: &ArchiveAssessmentRequest,
) -> Result<Idempotent<SkillAssessment>> {
    request.validate()?;
    move_assessment(
        pool,
        assessment_id,
        AssessmentStatus::Archived,
        &request.archived_by,
        Some(&request.reason),
    )
    .await
}

pub async fn get_assessment(pool: &PgPool, assessment_id: Uuid) -> Result<SkillAssessment> {
    let mut conn = pool.acquire().await?;
    AssessmentRepository::new(&mut conn)
        .find_by_id(assessment_id)
        .await
}

pub async fn list_assessments(
    pool: &PgPool,
    user_id: Uuid,
    skill_name: Option<&str>,
) -> Result<Vec<SkillAssessment>> {
    let mut conn = pool.acquire().await?;
    AssessmentRepository::new(&mut conn)
        .list_for_user(user_id, skill_name)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use AssessmentStatus::*;
    use chrono::Utc;

    fn assessment(status: AssessmentStatus) -> SkillAssessment {
        let now = Utc::now();
        SkillAssessment {
            assessment_id: Uuid::new_v4(),
            user_id: Uuid::from_u128(1),
            skill_name: "finishing".into(),
            score: 70,
            status,
            requires_validation: false,
            assessed_by: "coach_a".into(),
            assessed_at: now,
            validated_by: None,
            validated_at: None,
            archived_reason: None,
            previous_status: None,
            status_changed_at: now,
            status_changed_by: "coach_a".into(),
        }
    }

    #[test]
    fn transition_table_matches_lifecycle() {
        let allowed = [
            (NotAssessed, Assessed),
            (Assessed, Validated),
            (Assessed, Archived),
            (Validated, Archived),
        ];

        for from in AssessmentStatus::ALL {
            for to in AssessmentStatus::ALL {
                let expected = if from == to {
                    Some(AssessmentStep::Stay)
                } else if allowed.contains(&(from, to)) {
                    Some(AssessmentStep::Move)
                } else {
                    None
                };
                assert_eq!(assessment_step(from, to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn archived_rows_cannot_be_revived() {
        let err = check_step(&assessment(Archived), Validated).unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidStateTransition { entity: EntityKind::Assessment, .. }
        ));
    }

    #[test]
    fn identical_resubmission_is_detected() {
        let active = assessment(Assessed);
        let mut request = CreateAssessmentRequest {
            user_id: active.user_id,
            skill_name: active.skill_name.clone(),
            score: 70,
            assessed_by: "coach_a".into(),
            requires_validation: false,
        };
        assert!(is_resubmission(&active, &request));

        request.score = 85;
        assert!(!is_resubmission(&active, &request));

        request.score = 70;
        request.assessed_by = "coach_b".into();
        assert!(!is_resubmission(&active, &request));
    }

    #[test]
    fn out_of_range_scores_fail_validation() {
        let request = CreateAssessmentRequest {
            user_id: Uuid::new_v4(),
            skill_name: "finishing".into(),
            score: 101,
            assessed_by: "coach_a".into(),
            requires_validation: false,
        };
        let err: StorageError = request.validate().unwrap_err().into();
        assert!(matches!(err, StorageError::Validation(_)));
    }
}
