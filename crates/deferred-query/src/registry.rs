//! Pending queries and the slots their results are written to

use std::sync::{Arc, OnceLock};

use deferred_core::MultiResultCursor;

use crate::materialize::{FromResultRow, materialize};
use crate::DeferredResult;

/// Deferred write of a materialized result into its placeholder
pub(crate) type Commit = Box<dyn FnOnce() + Send>;

/// Where one query's result ends up
pub(crate) enum Slot<T> {
    Many(Arc<OnceLock<Vec<T>>>),
    Single {
        cell: Arc<OnceLock<T>>,
        fallback: fn() -> T,
    },
}

/// Type-erased view of a [`Slot`], so heterogeneous element types can share
/// one queue.
pub(crate) trait PendingSlot: Send + Sync {
    /// Materialize the cursor's current result set. Nothing is written to
    /// the placeholder until the returned commit runs.
    fn stage(&self, cursor: &mut MultiResultCursor) -> DeferredResult<Commit>;

    fn element_type(&self) -> &'static str;
}

impl<T> PendingSlot for Slot<T>
where
    T: FromResultRow + Send + Sync + 'static,
{
    fn stage(&self, cursor: &mut MultiResultCursor) -> DeferredResult<Commit> {
        let rows = materialize::<T>(cursor)?;
        let commit: Commit = match self {
            Slot::Many(cell) => {
                let cell = Arc::clone(cell);
                Box::new(move || fill(&cell, rows))
            }
            Slot::Single { cell, fallback } => {
                let value = rows.into_iter().next().unwrap_or_else(*fallback);
                let cell = Arc::clone(cell);
                Box::new(move || fill(&cell, value))
            }
        };
        Ok(commit)
    }

    fn element_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

fn fill<V>(cell: &OnceLock<V>, value: V) {
    if cell.set(value).is_err() {
        tracing::warn!("placeholder already populated, keeping the earlier result");
    }
}

pub(crate) struct PendingItem {
    /// Query text with parameters already inlined
    pub sql: String,
    pub slot: Box<dyn PendingSlot>,
}

/// Ordered queue of pending queries.
///
/// Item order is registration order, which is also the order of the
/// statements in the merged command and of the result sets that come back.
#[derive(Default)]
pub(crate) struct Registry {
    items: Vec<PendingItem>,
}

impl Registry {
    pub fn push(&mut self, sql: String, slot: Box<dyn PendingSlot>) {
        self.items.push(PendingItem { sql, slot });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingItem> {
        self.items.iter()
    }

    pub fn statements(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.sql.as_str()).collect()
    }

    /// All pending statements joined into one command
    pub fn merged_sql(&self, separator: &str) -> String {
        self.statements().join(separator)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
