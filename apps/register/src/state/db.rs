//! # Database State
//!
//! Wraps the `Database` handle for use in commands.
//!
//! The `Database` from `tally-db` contains a `SqlitePool`, which is
//! thread-safe. Commands run queries concurrently without explicit locking;
//! atomicity of a checkout is the store transaction's job.

use tally_db::{Database, DbConfig, DbResult};
use tracing::info;

use super::AppConfig;

#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Opens the configured database file and applies pending migrations.
    pub async fn open(config: &AppConfig) -> DbResult<Self> {
        let path = config
            .resolve_database_path()
            .map_err(|e| tally_db::DbError::ConnectionFailed(e.to_string()))?;
        info!(?path, "Opening register database");

        let db = Database::new(DbConfig::new(path).max_connections(config.max_connections)).await?;
        Ok(DbState::new(db))
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
