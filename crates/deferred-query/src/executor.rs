//! Single round trip execution of a pending batch

use std::sync::Arc;
use std::time::Instant;

use deferred_core::{Connection, ConnectionConfig, DatabaseDriver};

use crate::registry::Registry;
use crate::{DeferredError, DeferredOptions, DeferredResult};

/// Runs a registry's pending queries as one command
#[derive(Debug, Clone, Default)]
pub(crate) struct BatchExecutor {
    options: DeferredOptions,
}

impl BatchExecutor {
    pub fn new(options: DeferredOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DeferredOptions {
        &self.options
    }

    /// Execute every pending query and populate their placeholders.
    ///
    /// All placeholders are written or none are. The registry is cleared on
    /// success, and on failure only when `clear_on_failure` is set.
    pub async fn execute(
        &self,
        driver: &Arc<dyn DatabaseDriver>,
        config: &ConnectionConfig,
        registry: &mut Registry,
    ) -> DeferredResult<()> {
        if registry.is_empty() {
            tracing::debug!("no pending queries, skipping batch execution");
            return Ok(());
        }

        let start = Instant::now();
        let command = registry.merged_sql(&self.options.statement_separator);
        let outcome = self.run(driver, config, &command, registry).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                tracing::debug!(pending = registry.len(), elapsed_ms, "deferred batch executed");
                registry.clear();
                Ok(())
            }
            Err(err) => {
                tracing::debug!(
                    pending = registry.len(),
                    elapsed_ms,
                    error = %err,
                    "deferred batch failed"
                );
                if self.options.clear_on_failure {
                    registry.clear();
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        driver: &Arc<dyn DatabaseDriver>,
        config: &ConnectionConfig,
        command: &str,
        registry: &Registry,
    ) -> DeferredResult<()> {
        let conn = driver.connect(config).await?;
        let outcome = Self::populate(conn.as_ref(), command, registry).await;

        if let Err(close_err) = conn.close().await {
            tracing::warn!(
                error = %close_err,
                batch_failed = outcome.is_err(),
                "failed to close connection"
            );
        }
        outcome
    }

    async fn populate(
        conn: &dyn Connection,
        command: &str,
        registry: &Registry,
    ) -> DeferredResult<()> {
        let mut cursor = conn.query_multi(command).await?;
        tracing::debug!(
            pending = registry.len(),
            result_sets = cursor.result_count(),
            "received batch results"
        );
        if cursor.result_count() != registry.len() {
            return Err(DeferredError::ResultSetMismatch {
                expected: registry.len(),
                actual: cursor.result_count(),
            });
        }

        let mut commits = Vec::with_capacity(registry.len());
        for (index, item) in registry.iter().enumerate() {
            if index > 0 {
                cursor.next_result();
            }
            let commit = item.slot.stage(&mut cursor).inspect_err(|err| {
                tracing::debug!(
                    index,
                    element_type = item.slot.element_type(),
                    error = %err,
                    "failed to materialize result set"
                );
            })?;
            commits.push(commit);
        }

        for commit in commits {
            commit();
        }
        Ok(())
    }
}
