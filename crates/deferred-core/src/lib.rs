//! Deferred Core - transport abstractions for batched query execution
//!
//! This crate defines what the batching engine needs from a database:
//!
//! - `DatabaseDriver` - opens connections from a `ConnectionConfig`
//! - `Connection` - runs statements, including multi-statement commands
//! - `MultiResultCursor` - walks the result sets of one command in order
//! - Common types like `Value`, `Row`, `QueryResult`

mod connection;
mod cursor;
mod driver;
mod error;
mod statement;
mod types;

pub use connection::*;
pub use cursor::*;
pub use driver::*;
pub use error::*;
pub use statement::*;
pub use types::*;
