//! Tournament results and rewards engine: persistence plus the transactional
//! operations that turn round results into rankings, rewards and skill ratings.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub mod config;
pub mod dto;
pub mod error;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod services;

pub use config::EngineConfig;
pub use error::{Result, StorageError};

/// Shared handle on the connection pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_max_connections(database_url, 10).await
    }

    pub async fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Outcome of an operation that may already have happened.
///
/// A replay is not an error: `Duplicate` carries the result recorded the first
/// time, so callers get the same answer either way.
#[derive(Debug, Clone, PartialEq)]
pub enum Idempotent<T> {
    Applied(T),
    Duplicate(T),
}

impl<T> Idempotent<T> {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Self::Applied(value) | Self::Duplicate(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Applied(value) | Self::Duplicate(value) => value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Idempotent<U> {
        match self {
            Self::Applied(value) => Idempotent::Applied(f(value)),
            Self::Duplicate(value) => Idempotent::Duplicate(f(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Idempotent;

    #[test]
    fn idempotent_keeps_its_flavour_through_map() {
        let applied = Idempotent::Applied(2).map(|v| v * 10);
        assert_eq!(applied, Idempotent::Applied(20));
        assert!(!applied.is_duplicate());

        let replay = Idempotent::Duplicate("ranked").map(str::len);
        assert!(replay.is_duplicate());
        assert_eq!(*replay.get(), 6);
        assert_eq!(replay.into_inner(), 6);
    }
}
