//! Connection trait

use crate::{MultiResultCursor, QueryResult, Result, Value, split_statements};
use async_trait::async_trait;

/// An open database connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite")
    fn driver_name(&self) -> &str;

    /// Execute a single query that returns rows
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Send a command made of several `;`-separated statements in one call
    /// and return a cursor over every result set it produced, in statement
    /// order.
    ///
    /// The default implementation splits the command and runs each
    /// statement through [`query`](Self::query). Drivers whose wire protocol
    /// returns several result sets for one command should override this.
    async fn query_multi(&self, sql: &str) -> Result<MultiResultCursor> {
        let statements = split_statements(sql);
        tracing::debug!(
            statements = statements.len(),
            "running multi-statement command one statement at a time"
        );

        let mut results = Vec::with_capacity(statements.len());
        for statement in &statements {
            results.push(self.query(statement, &[]).await?);
        }
        Ok(MultiResultCursor::new(results))
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}
