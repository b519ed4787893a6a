use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DesyncKind {
    /// Progress ladder above level 0 but no active license.
    MissingLicense,
    /// Active license with no progress row behind it.
    MissingProgress,
    LevelMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DesyncIssue {
    pub user_id: Uuid,
    pub specialization: String,
    pub kind: DesyncKind,
    pub progress_level: Option<i32>,
    pub license_level: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// The progress ladder is authoritative; licenses follow it.
    ProgressToLicense,
    /// The issued license is authoritative; progress follows it.
    LicenseToProgress,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProgressToLicense => f.write_str("progress_to_license"),
            Self::LicenseToProgress => f.write_str("license_to_progress"),
        }
    }
}

impl std::str::FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "progress_to_license" => Ok(Self::ProgressToLicense),
            "license_to_progress" => Ok(Self::LicenseToProgress),
            other => Err(format!(
                "unknown direction '{other}', expected progress_to_license or license_to_progress"
            )),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DesyncFilter {
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SyncRequest {
    pub direction: SyncDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SpecializationChange {
    pub specialization: String,
    pub before: Option<i32>,
    pub after: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncResult {
    pub user_id: Uuid,
    pub direction: SyncDirection,
    pub changes: Vec<SpecializationChange>,
}

impl SyncResult {
    pub fn already_in_sync(&self) -> bool {
        self.changes.is_empty()
    }
}
