//! The public entry point: register queries now, execute them together later

use std::fmt;
use std::sync::Arc;

use deferred_core::{ConnectionConfig, DatabaseDriver};
use deferred_drivers::DriverRegistry;

use crate::executor::BatchExecutor;
use crate::inline::{inline_command, trim_statement};
use crate::registry::{Registry, Slot};
use crate::{
    Aggregate, CastWidth, ComposableQuery, DeferredOptions, DeferredResult, FromResultRow,
    FutureQuery, FutureValue, Projection, QuerySource, SqlCommand,
};


/// Integer types a `SUM` aggregate can be read into
pub trait SumTarget: FromResultRow + Default + Send + Sync + 'static {
    const WIDTH: CastWidth;
}

impl SumTarget for i32 {
    const WIDTH: CastWidth = CastWidth::Int;
}

impl SumTarget for Option<i32> {
    const WIDTH: CastWidth = CastWidth::Int;
}

impl SumTarget for i64 {
    const WIDTH: CastWidth = CastWidth::BigInt;
}

impl SumTarget for Option<i64> {
    const WIDTH: CastWidth = CastWidth::BigInt;
}

/// Collects queries and runs them as a single multi-statement command.
///
/// Each `register_*` call builds the query's SQL, renders its parameters
/// inline and queues it, returning a placeholder. Nothing touches the
/// database until [`execute`](Self::execute), which sends every queued
/// statement in one round trip and fills the placeholders in registration
/// order.
///
/// Parameter values are written into the SQL text rather than bound by the
/// server. Only pass values from trusted sources.
pub struct DeferredContext {
    driver: Arc<dyn DatabaseDriver>,
    config: ConnectionConfig,
    executor: BatchExecutor,
    registry: Registry,
}

impl DeferredContext {
    /// Create a context from a connection string using the built-in drivers
    pub fn new(connection_string: &str) -> DeferredResult<Self> {
        Self::from_registry(&DriverRegistry::with_defaults(), connection_string)
    }

    /// Create a context from a connection string resolved against `drivers`
    pub fn from_registry(drivers: &DriverRegistry, connection_string: &str) -> DeferredResult<Self> {
        let (driver, config) = drivers.resolve(connection_string)?;
        Ok(Self::with_driver(driver, config))
    }

    pub fn with_driver(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig) -> Self {
        Self {
            driver,
            config,
            executor: BatchExecutor::default(),
            registry: Registry::default(),
        }
    }

    pub fn with_options(mut self, options: DeferredOptions) -> Self {
        self.executor = BatchExecutor::new(options);
        self
    }

    pub fn options(&self) -> &DeferredOptions {
        self.executor.options()
    }

    /// Queue a query whose rows become a sequence of `T`
    pub fn register_many<T, Q>(&mut self, query: &Q) -> DeferredResult<FutureQuery<T>>
    where
        T: FromResultRow + Send + Sync + 'static,
        Q: QuerySource + ?Sized,
    {
        let command = query.build_command()?;
        let placeholder = FutureQuery::new();
        self.enqueue(command, Slot::Many(placeholder.cell()))?;
        Ok(placeholder)
    }

    /// Queue `query` with its projection replaced by `aggregate`
    pub fn register_scalar<T, Q>(
        &mut self,
        query: &Q,
        aggregate: Aggregate,
    ) -> DeferredResult<FutureValue<T>>
    where
        T: FromResultRow + Default + Send + Sync + 'static,
        Q: ComposableQuery,
    {
        let command = query
            .with_projection(Projection::Aggregate(aggregate))
            .build_command()?;
        self.register_single(command)
    }

    /// `SUM(column)` cast to the width of `T`
    pub fn register_sum<T, Q>(&mut self, query: &Q, column: &str) -> DeferredResult<FutureValue<T>>
    where
        T: SumTarget,
        Q: ComposableQuery,
    {
        self.register_scalar(
            query,
            Aggregate::Sum {
                column: column.to_string(),
                width: T::WIDTH,
            },
        )
    }

    pub fn register_count<Q: ComposableQuery>(
        &mut self,
        query: &Q,
    ) -> DeferredResult<FutureValue<i32>> {
        self.register_scalar(query, Aggregate::Count)
    }

    pub fn register_long_count<Q: ComposableQuery>(
        &mut self,
        query: &Q,
    ) -> DeferredResult<FutureValue<i64>> {
        self.register_scalar(query, Aggregate::LongCount)
    }

    /// The first row of `query`, or `T::default()` when it has none
    pub fn register_first<T, Q>(&mut self, query: &Q) -> DeferredResult<FutureValue<T>>
    where
        T: FromResultRow + Default + Send + Sync + 'static,
        Q: ComposableQuery,
    {
        self.register_single(query.take(1).build_command()?)
    }

    /// The first row after skipping `count` rows
    pub fn register_skip<T, Q>(&mut self, query: &Q, count: u64) -> DeferredResult<FutureValue<T>>
    where
        T: FromResultRow + Default + Send + Sync + 'static,
        Q: ComposableQuery,
    {
        self.register_single(query.skip(count).build_command()?)
    }

    /// The first row of the first `count` rows
    pub fn register_take<T, Q>(&mut self, query: &Q, count: u64) -> DeferredResult<FutureValue<T>>
    where
        T: FromResultRow + Default + Send + Sync + 'static,
        Q: ComposableQuery,
    {
        self.register_single(query.take(count).build_command()?)
    }

    /// Number of queued queries
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// SQL of every queued query, parameters inlined, in execution order
    pub fn pending_sql(&self) -> Vec<&str> {
        self.registry.statements()
    }

    /// Drop every queued query without executing it. Their placeholders stay
    /// unpopulated.
    pub fn clear(&mut self) {
        if !self.registry.is_empty() {
            tracing::debug!(pending = self.registry.len(), "discarding pending queries");
        }
        self.registry.clear();
    }

    /// Send every queued query in one command and populate the placeholders.
    ///
    /// With nothing queued this returns immediately without connecting. On
    /// failure no placeholder is populated and the queue is kept (unless
    /// [`DeferredOptions::clear_on_failure`] is set).
    #[tracing::instrument(skip(self), fields(driver = self.driver.name(), pending = self.registry.len()))]
    pub async fn execute(&mut self) -> DeferredResult<()> {
        self.executor
            .execute(&self.driver, &self.config, &mut self.registry)
            .await
    }

    fn register_single<T>(&mut self, command: SqlCommand) -> DeferredResult<FutureValue<T>>
    where
        T: FromResultRow + Default + Send + Sync + 'static,
    {
        let placeholder = FutureValue::new();
        self.enqueue(
            command,
            Slot::Single {
                cell: placeholder.cell(),
                fallback: T::default,
            },
        )?;
        Ok(placeholder)
    }

    fn enqueue<T>(&mut self, command: SqlCommand, slot: Slot<T>) -> DeferredResult<()>
    where
        T: FromResultRow + Send + Sync + 'static,
    {
        let sql = trim_statement(&inline_command(&command)?);
        tracing::debug!(
            pending = self.registry.len() + 1,
            sql_preview = %sql.chars().take(80).collect::<String>(),
            "registered deferred query"
        );
        self.registry.push(sql, Box::new(slot));
        Ok(())
    }
}

impl fmt::Debug for DeferredContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredContext")
            .field("driver", &self.driver.name())
            .field("config", &self.config)
            .field("options", self.executor.options())
            .field("pending", &self.registry.len())
            .finish()
    }
}
