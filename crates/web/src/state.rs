use std::sync::Arc;

use axum::extract::FromRef;
use storage::ledger::{LedgerWriter, PgLedgerWriter};
use storage::{Database, EngineConfig};

/// Shared by every handler. The engine config is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<EngineConfig>,
    pub ledger: Arc<dyn LedgerWriter>,
}

impl AppState {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
            ledger: Arc::new(PgLedgerWriter),
        }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
