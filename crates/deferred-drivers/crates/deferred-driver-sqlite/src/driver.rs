//! SQLite driver implementation

use async_trait::async_trait;
use deferred_core::{Connection, ConnectionConfig, DatabaseDriver, DbError, Result};
use std::sync::Arc;

use crate::SqliteConnection;

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, config), fields(path = config.get_string("path").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let path = config.get_string("path").ok_or_else(|| {
            DbError::Configuration(
                "SQLite requires a database path. Example: sqlite:///path/to/database.db".into(),
            )
        })?;

        let conn = SqliteConnection::open(&path)?;
        if let Some(mode) = config.params.get("journal_mode") {
            conn.set_pragma("journal_mode", mode)?;
        }

        tracing::info!(path = %path, "SQLite connection created");
        Ok(Arc::new(conn))
    }
}
