use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    /// JSON reward policy; the built-in policy is used when unset.
    pub reward_policy_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("Cannot load PORT env variable")?
                .parse()
                .context("PORT must be a number")?,
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            database_max_connections: match std::env::var("DATABASE_MAX_CONNECTIONS") {
                Ok(raw) => raw
                    .parse()
                    .context("DATABASE_MAX_CONNECTIONS must be a number")?,
                Err(_) => 10,
            },
            reward_policy_path: std::env::var_os("REWARD_POLICY_PATH").map(PathBuf::from),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
