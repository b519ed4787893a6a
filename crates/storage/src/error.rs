use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid state transition for {entity} {id}: {from} -> {to}")]
    InvalidStateTransition {
        entity: EntityKind,
        id: String,
        from: String,
        to: String,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Tournament,
    Assessment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tournament => f.write_str("tournament"),
            Self::Assessment => f.write_str("assessment"),
        }
    }
}

impl StorageError {
    pub fn invalid_transition(
        entity: EntityKind,
        id: impl fmt::Display,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        Self::InvalidStateTransition {
            entity,
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(sqlx::Error::Database(e))
                if e.code().as_deref() == Some("23505")
        )
    }

    /// Name of the violated constraint, when Postgres reports one.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            StorageError::Database(sqlx::Error::Database(e)) => e.constraint(),
            _ => None,
        }
    }

    /// True when this is a unique violation raised by the named constraint or index.
    pub fn violates(&self, constraint: &str) -> bool {
        self.is_unique_violation() && self.constraint() == Some(constraint)
    }

    /// Errors a caller may resolve by retrying later with the same input.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::ConcurrencyConflict(_))
    }
}

impl From<validator::ValidationErrors> for StorageError {
    fn from(errors: validator::ValidationErrors) -> Self {
        StorageError::Validation(errors.to_string())
    }
}

/// Maps a unique violation on any constraint other than `expected` to a fatal
/// `ConstraintViolation`; everything else passes through unchanged.
pub(crate) fn classify_conflict(err: StorageError, expected: &[&str]) -> StorageError {
    if err.is_unique_violation() && !expected.iter().any(|c| err.violates(c)) {
        let name = err.constraint().unwrap_or("unknown").to_string();
        return StorageError::ConstraintViolation(format!("unexpected conflict on {name}"));
    }
    err
}
