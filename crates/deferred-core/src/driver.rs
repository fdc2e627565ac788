//! Database driver trait and connection configuration

use crate::{Connection, DbError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Driver used when a connection string carries no scheme
pub const DEFAULT_DRIVER: &str = "sqlite";

/// Factory for connections to one kind of database
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Driver identifier, matched against the connection-string scheme
    fn name(&self) -> &'static str;

    /// Open a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Driver ID (e.g., "sqlite")
    pub driver: String,
    /// Database name, file path or driver-specific target
    pub database: Option<String>,
    /// Additional connection parameters
    pub params: HashMap<String, String>,
}

impl ConnectionConfig {
    /// Create an empty configuration for a driver
    pub fn new(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            database: None,
            params: HashMap::new(),
        }
    }

    /// Parse a connection string.
    ///
    /// Accepted forms:
    /// - `driver://target?key=value&...`
    /// - `driver:target` (so `sqlite::memory:` targets `:memory:`)
    /// - a bare target, which selects [`DEFAULT_DRIVER`]
    pub fn parse(conn_str: &str) -> Result<Self> {
        let conn_str = conn_str.trim();
        if conn_str.is_empty() {
            return Err(DbError::Configuration("connection string is empty".into()));
        }

        let (driver, rest) = match split_scheme(conn_str) {
            Some((scheme, rest)) => (
                scheme.to_ascii_lowercase(),
                rest.strip_prefix("//").unwrap_or(rest),
            ),
            None => (DEFAULT_DRIVER.to_string(), conn_str),
        };

        let (target, query) = match rest.split_once('?') {
            Some((target, query)) => (target, Some(query)),
            None => (rest, None),
        };

        let mut config = Self::new(&driver);
        if !target.is_empty() {
            config.database = Some(target.to_string());
        }
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            config.params.insert(key.to_string(), value.to_string());
        }
        Ok(config)
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<String> {
        if let Some(val) = self.params.get(key) {
            return Some(val.clone());
        }
        match key {
            "database" | "path" => self.database.clone(),
            _ => None,
        }
    }
}

/// Split `scheme:rest`. Single-letter schemes are treated as Windows drive
/// letters, not drivers.
fn split_scheme(conn_str: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = conn_str.split_once(':')?;
    let valid = scheme.len() > 1
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '_');
    valid.then_some((scheme, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_memory() {
        let config = ConnectionConfig::parse("sqlite::memory:").unwrap();
        assert_eq!(config.driver, "sqlite");
        assert_eq!(config.database.as_deref(), Some(":memory:"));
    }

    #[test]
    fn test_parse_url_form_with_params() {
        let config = ConnectionConfig::parse("SQLite://data/app.db?journal_mode=WAL&ro").unwrap();
        assert_eq!(config.driver, "sqlite");
        assert_eq!(config.database.as_deref(), Some("data/app.db"));
        assert_eq!(config.get_string("journal_mode").as_deref(), Some("WAL"));
        assert_eq!(config.get_string("ro").as_deref(), Some(""));
    }

    #[test]
    fn test_parse_absolute_path_url() {
        let config = ConnectionConfig::parse("sqlite:///var/db/app.db").unwrap();
        assert_eq!(config.database.as_deref(), Some("/var/db/app.db"));
    }

    #[test]
    fn test_parse_bare_path_uses_default_driver() {
        let config = ConnectionConfig::parse("/tmp/app.db").unwrap();
        assert_eq!(config.driver, DEFAULT_DRIVER);
        assert_eq!(config.get_string("path").as_deref(), Some("/tmp/app.db"));

        let windows = ConnectionConfig::parse(r"C:\data\app.db").unwrap();
        assert_eq!(windows.driver, DEFAULT_DRIVER);
        assert_eq!(windows.database.as_deref(), Some(r"C:\data\app.db"));
    }

    #[test]
    fn test_parse_empty_is_rejected() {
        assert!(matches!(
            ConnectionConfig::parse("  "),
            Err(DbError::Configuration(_))
        ));
    }
}
