//! Driver registry for resolving connection strings to drivers

use deferred_core::{ConnectionConfig, DatabaseDriver, DbError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available database drivers
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "sqlite")]
        registry.register(Arc::new(crate::sqlite::SqliteDriver::new()));

        registry
    }

    /// Register a new driver
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let name = driver.name().to_string();
        tracing::info!(driver = %name, "registering database driver");
        self.drivers.insert(name, driver);
    }

    /// Get a driver by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatabaseDriver>> {
        let driver = self.drivers.get(name).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %name, "driver not found in registry");
        }
        driver
    }

    /// Parse a connection string and return the driver it names along with
    /// the parsed configuration
    pub fn resolve(&self, conn_str: &str) -> Result<(Arc<dyn DatabaseDriver>, ConnectionConfig)> {
        let config = ConnectionConfig::parse(conn_str)?;
        let driver = self.get(&config.driver).ok_or_else(|| {
            DbError::NotFound(format!("no driver registered for '{}'", config.driver))
        })?;
        Ok((driver, config))
    }
}
