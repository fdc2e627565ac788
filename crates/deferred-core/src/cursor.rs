//! Cursor over the sequential result sets of a multi-statement command

use std::collections::VecDeque;

use crate::{DbError, QueryResult, Result, Row, Value};

/// Forward-only cursor over every result set a command produced, in
/// statement order.
///
/// A fresh cursor is positioned on the first result set (if any) and before
/// its first row. [`next_row`](Self::next_row) advances within the current
/// set and [`next_result`](Self::next_result) moves to the following set.
/// Neither ever rewinds.
#[derive(Debug)]
pub struct MultiResultCursor {
    pending: VecDeque<QueryResult>,
    current: Option<QueryResult>,
    /// Index of the current row, `None` while positioned before the first row.
    row: Option<usize>,
    total: usize,
}

impl MultiResultCursor {
    /// Wrap the result sets of one execution
    pub fn new(results: Vec<QueryResult>) -> Self {
        let total = results.len();
        let mut pending: VecDeque<QueryResult> = results.into();
        let current = pending.pop_front();
        Self {
            pending,
            current,
            row: None,
            total,
        }
    }

    /// A cursor over zero result sets
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of result sets the command produced
    pub fn result_count(&self) -> usize {
        self.total
    }

    /// Whether the cursor is positioned on a result set
    pub fn has_result(&self) -> bool {
        self.current.is_some()
    }

    /// Move to the next result set. Returns `false` once no sets remain.
    pub fn next_result(&mut self) -> bool {
        self.current = self.pending.pop_front();
        self.row = None;
        self.current.is_some()
    }

    /// Move to the next row of the current result set. Returns `false` when
    /// the set is exhausted or the cursor is past the last set.
    pub fn next_row(&mut self) -> bool {
        let Some(result) = &self.current else {
            return false;
        };
        let next = self.row.map_or(0, |idx| idx + 1);
        if next < result.rows.len() {
            self.row = Some(next);
            true
        } else {
            self.row = Some(result.rows.len());
            false
        }
    }

    /// Column count of the current result set
    pub fn column_count(&self) -> usize {
        self.current.as_ref().map_or(0, QueryResult::column_count)
    }

    /// Name of a column in the current result set
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.current
            .as_ref()
            .and_then(|result| result.columns.get(index))
            .map(|column| column.name.as_str())
    }

    /// The row the cursor is positioned on
    pub fn current_row(&self) -> Option<&Row> {
        let result = self.current.as_ref()?;
        result.rows.get(self.row?)
    }

    /// Value of a column in the current row
    pub fn value_at(&self, index: usize) -> Result<&Value> {
        let row = self
            .current_row()
            .ok_or_else(|| DbError::Query("cursor is not positioned on a row".into()))?;
        row.get(index).ok_or_else(|| {
            DbError::NotFound(format!(
                "column index {} out of range ({} columns)",
                index,
                row.len()
            ))
        })
    }
}
