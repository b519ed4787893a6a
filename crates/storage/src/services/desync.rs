//! Reconciliation between the progress ladder and issued licenses.
//!
//! Both record the same fact (a user's level in a specialization) and drift
//! apart when one writer updates only its own side. Scanning is read-only.
//! Syncing makes the target side follow the authoritative side; it never
//! deactivates a license and never deletes progress.

use std::collections::BTreeMap;

use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::dto::desync::{DesyncIssue, DesyncKind, SpecializationChange, SyncDirection, SyncResult};
use crate::error::Result;
use crate::models::{SpecializationProgress, UserLicense};
use crate::repository::ProgressRepository;

type Key = (Uuid, String);

#[derive(Default)]
struct Sides<'a> {
    progress: Option<&'a SpecializationProgress>,
    license: Option<&'a UserLicense>,
}

fn pair_up<'a>(
    progress: &'a [SpecializationProgress],
    licenses: &'a [UserLicense],
) -> BTreeMap<Key, Sides<'a>> {
    let mut sides: BTreeMap<Key, Sides<'a>> = BTreeMap::new();

    for row in progress {
        sides
            .entry((row.user_id, row.specialization.clone()))
            .or_default()
            .progress = Some(row);
    }
    for license in licenses.iter().filter(|l| l.is_active) {
        sides
            .entry((license.user_id, license.specialization.clone()))
            .or_default()
            .license = Some(license);
    }

    sides
}

/// Every disagreement between the two sides, ordered by user then specialization.
pub fn classify(progress: &[SpecializationProgress], licenses: &[UserLicense]) -> Vec<DesyncIssue> {
    pair_up(progress, licenses)
        .into_iter()
        .filter_map(|((user_id, specialization), sides)| {
            let progress_level = sides.progress.map(|p| p.current_level);
            let license_level = sides.license.map(|l| l.license_level);

            let kind = match (progress_level, license_level) {
                (Some(level), None) if level > 0 => DesyncKind::MissingLicense,
                (None, Some(_)) => DesyncKind::MissingProgress,
                (Some(p), Some(l)) if p != l => DesyncKind::LevelMismatch,
                _ => return None,
            };

            Some(DesyncIssue {
                user_id,
                specialization,
                kind,
                progress_level,
                license_level,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    IssueLicense {
        specialization: String,
        level: i32,
    },
    SetLicenseLevel {
        license_id: Uuid,
        specialization: String,
        from: i32,
        to: i32,
    },
    SetProgress {
        specialization: String,
        from: Option<i32>,
        to: i32,
    },
}

/// Actions that bring one user's target side in line with the authoritative side.
pub fn plan_sync(
    direction: SyncDirection,
    progress: &[SpecializationProgress],
    licenses: &[UserLicense],
) -> Vec<SyncAction> {
    pair_up(progress, licenses)
        .into_iter()
        .filter_map(|((_, specialization), sides)| match direction {
            SyncDirection::ProgressToLicense => {
                let level = sides.progress?.current_level;
                match sides.license {
                    None if level > 0 => Some(SyncAction::IssueLicense {
                        specialization,
                        level,
                    }),
                    Some(license) if license.license_level != level => {
                        Some(SyncAction::SetLicenseLevel {
                            license_id: license.license_id,
                            specialization,
                            from: license.license_level,
                            to: level,
                        })
                    }
                    _ => None,
                }
            }
            SyncDirection::LicenseToProgress => {
                let level = sides.license?.license_level;
                let current = sides.progress.map(|p| p.current_level);
                (current != Some(level)).then_some(SyncAction::SetProgress {
                    specialization,
                    from: current,
                    to: level,
                })
            }
        })
        .collect()
}

/// Scan for desynced users. Reads both sides from one snapshot.
#[instrument(skip(pool))]
pub async fn find_desync_issues(
    pool: &PgPool,
    specialization: Option<&str>,
) -> Result<Vec<DesyncIssue>> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
        .execute(&mut *tx)
        .await?;

    let mut repo = ProgressRepository::new(&mut tx);
    let progress = repo.list_progress(specialization).await?;
    let licenses = repo.list_active_licenses(specialization).await?;
    tx.commit().await?;

    let issues = classify(&progress, &licenses);
    info!(issues = issues.len(), "desync scan finished");

    Ok(issues)
}

/// Reconcile one user in the given direction. A user already in sync gets an
/// empty change list.
#[instrument(skip(pool))]
pub async fn sync_user(pool: &PgPool, user_id: Uuid, direction: SyncDirection) -> Result<SyncResult> {
    let mut tx = pool.begin().await?;
    let mut repo = ProgressRepository::new(&mut tx);

    let progress = repo.lock_user_progress(user_id).await?;
    let licenses = repo.lock_user_licenses(user_id).await?;

    let mut changes = Vec::new();
    for action in plan_sync(direction, &progress, &licenses) {
        match action {
            SyncAction::IssueLicense {
                specialization,
                level,
            } => {
                if repo
                    .issue_license(user_id, &specialization, level)
                    .await?
                    .is_some()
                {
                    changes.push(SpecializationChange {
                        specialization,
                        before: None,
                        after: level,
                    });
                }
            }
            SyncAction::SetLicenseLevel {
                license_id,
                specialization,
                from,
                to,
            } => {
                repo.set_license_level(license_id, to).await?;
                changes.push(SpecializationChange {
                    specialization,
                    before: Some(from),
                    after: to,
                });
            }
            SyncAction::SetProgress {
                specialization,
                from,
                to,
            } => {
                repo.upsert_progress(user_id, &specialization, to).await?;
                changes.push(SpecializationChange {
                    specialization,
                    before: from,
                    after: to,
                });
            }
        }
    }

    tx.commit().await?;

    info!(%user_id, %direction, changes = changes.len(), "user synced");

    Ok(SyncResult {
        user_id,
        direction,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn progress(user: u128, spec: &str, level: i32) -> SpecializationProgress {
        SpecializationProgress {
            user_id: Uuid::from_u128(user),
            specialization: spec.to_string(),
            current_level: level,
            updated_at: Utc::now(),
        }
    }

    fn license(user: u128, spec: &str, level: i32) -> UserLicense {
        let now = Utc::now();
        UserLicense {
            license_id: Uuid::from_u128(1000 + user),
            user_id: Uuid::from_u128(user),
            specialization: spec.to_string(),
            license_level: level,
            is_active: true,
            issued_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn classification_covers_each_kind() {
        let progress = vec![
            progress(1, "player", 3),
            progress(2, "coach", 2),
            progress(3, "player", 4),
            progress(4, "player", 0),
        ];
        let licenses = vec![license(2, "coach", 1), license(3, "player", 4), license(5, "referee", 2)];

        let issues = classify(&progress, &licenses);
        let kinds: Vec<(u128, DesyncKind)> = issues
            .iter()
            .map(|i| (i.user_id.as_u128(), i.kind))
            .collect();

        assert_eq!(
            kinds,
            vec![
                (1, DesyncKind::MissingLicense),
                (2, DesyncKind::LevelMismatch),
                (5, DesyncKind::MissingProgress),
            ]
        );
        assert_eq!(issues[1].progress_level, Some(2));
        assert_eq!(issues[1].license_level, Some(1));
    }

    #[test]
    fn inactive_licenses_are_ignored() {
        let mut revoked = license(1, "player", 2);
        revoked.is_active = false;

        let issues = classify(&[progress(1, "player", 2)], &[revoked]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, DesyncKind::MissingLicense);
    }

    #[test]
    fn progress_to_license_issues_and_updates_licenses() {
        let progress = vec![progress(1, "coach", 2), progress(1, "player", 3)];
        let licenses = vec![license(1, "player", 1)];

        let actions = plan_sync(SyncDirection::ProgressToLicense, &progress, &licenses);

        assert_eq!(
            actions,
            vec![
                SyncAction::IssueLicense {
                    specialization: "coach".into(),
                    level: 2
                },
                SyncAction::SetLicenseLevel {
                    license_id: Uuid::from_u128(1001),
                    specialization: "player".into(),
                    from: 1,
                    to: 3
                },
            ]
        );
    }

    #[test]
    fn license_to_progress_creates_missing_progress() {
        let licenses = vec![license(1, "referee", 2)];
        let actions = plan_sync(SyncDirection::LicenseToProgress, &[], &licenses);

        assert_eq!(
            actions,
            vec![SyncAction::SetProgress {
                specialization: "referee".into(),
                from: None,
                to: 2
            }]
        );
    }

    #[test]
    fn sync_never_deactivates_or_deletes() {
        // progress without a license cannot be fixed by moving progress
        assert!(plan_sync(SyncDirection::LicenseToProgress, &[progress(1, "player", 3)], &[]).is_empty());
        // a license without progress is left alone when progress is authoritative
        assert!(plan_sync(SyncDirection::ProgressToLicense, &[], &[license(1, "player", 3)]).is_empty());
    }

    #[test]
    fn users_in_sync_need_no_actions() {
        let progress = vec![progress(1, "player", 2)];
        let licenses = vec![license(1, "player", 2)];

        assert!(classify(&progress, &licenses).is_empty());
        assert!(plan_sync(SyncDirection::ProgressToLicense, &progress, &licenses).is_empty());
        assert!(plan_sync(SyncDirection::LicenseToProgress, &progress, &licenses).is_empty());
    }
}
