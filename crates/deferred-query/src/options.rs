//! Tuning knobs for a [`DeferredContext`](crate::DeferredContext)

use serde::{Deserialize, Serialize};

pub const DEFAULT_STATEMENT_SEPARATOR: &str = ";\n\n";

/// Options for batching and executing deferred queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeferredOptions {
    /// Text placed between pending statements in the merged command
    pub statement_separator: String,
    /// Drop pending queries when an execution fails instead of keeping them
    /// for inspection or another attempt
    pub clear_on_failure: bool,
}

impl Default for DeferredOptions {
    fn default() -> Self {
        Self {
            statement_separator: DEFAULT_STATEMENT_SEPARATOR.to_string(),
            clear_on_failure: false,
        }
    }
}

impl DeferredOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statement_separator(mut self, separator: impl Into<String>) -> Self {
        self.statement_separator = separator.into();
        self
    }

    pub fn with_clear_on_failure(mut self, clear: bool) -> Self {
        self.clear_on_failure = clear;
        self
    }
}
