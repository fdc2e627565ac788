//! Deferred Drivers - database driver implementations
//!
//! This crate bundles the concrete implementations of the transport traits
//! defined in `deferred-core`, selected by cargo features.

#[cfg(feature = "sqlite")]
pub use deferred_driver_sqlite as sqlite;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from deferred-core
pub use deferred_core::{
    Connection, ConnectionConfig, DatabaseDriver, DbError, MultiResultCursor, QueryResult, Result,
    Row, Value,
};
