//! Deferred Query - batch independently built queries into one round trip
//!
//! Callers register queries on a [`DeferredContext`] and get back typed
//! placeholders ([`FutureQuery`] for row sequences, [`FutureValue`] for
//! single values). One call to [`DeferredContext::execute`] merges every
//! pending query into a multi-statement command, reads the result sets back
//! in order and fills each placeholder from its own set.
//!
//! ```no_run
//! use deferred_query::{DeferredContext, SelectQuery, SqlParameter};
//!
//! # async fn run() -> deferred_query::DeferredResult<()> {
//! let mut ctx = DeferredContext::new("sqlite://shop.db")?;
//! let orders = SelectQuery::table("orders")
//!     .filter("customer_id = @customer")
//!     .bind(SqlParameter::int("@customer", 7));
//!
//! let ids = ctx.register_many::<(i64,), _>(&orders.clone().columns(["id"]))?;
//! let count = ctx.register_count(&orders)?;
//! ctx.execute().await?;
//!
//! assert_eq!(ids.items()?.len() as i32, *count.value()?);
//! # Ok(())
//! # }
//! ```

mod command;
mod context;
mod error;
mod executor;
mod inline;
mod materialize;
mod options;
mod placeholder;
mod registry;
mod select;

#[cfg(test)]
mod test_helpers;

pub use command::{
    Aggregate, CastWidth, ComposableQuery, ParamType, Projection, QuerySource, SqlCommand,
    SqlParameter,
};
pub use context::{DeferredContext, SumTarget};
pub use error::{DeferredError, DeferredResult};
pub use inline::{inline_command, inline_parameters, render_literal};
pub use materialize::{FromColumn, FromResultRow, RowShape, materialize};
pub use options::{DEFAULT_STATEMENT_SEPARATOR, DeferredOptions};
pub use placeholder::{FutureQuery, FutureValue};
pub use select::{Dialect, SelectQuery, SortOrder};

// Re-export the row types element impls are written against
pub use deferred_core::{Row, Value};
