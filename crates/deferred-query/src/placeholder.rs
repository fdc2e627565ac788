//! Handles returned at registration time and filled in by a batch execution
//!
//! A placeholder shares a write-once cell with the pending batch. The cell
//! is set exactly once, when the batch that owns the query executes
//! successfully, and is never reset afterwards.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::{DeferredError, DeferredResult};

/// The rows of a deferred query
pub struct FutureQuery<T> {
    items: Arc<OnceLock<Vec<T>>>,
}

impl<T> FutureQuery<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn cell(&self) -> Arc<OnceLock<Vec<T>>> {
        Arc::clone(&self.items)
    }

    /// Whether the owning batch has executed
    pub fn has_value(&self) -> bool {
        self.items.get().is_some()
    }

    /// The fetched rows. Fails until the owning batch has executed.
    pub fn items(&self) -> DeferredResult<&[T]> {
        self.items
            .get()
            .map(Vec::as_slice)
            .ok_or(DeferredError::PrematureRead("values"))
    }

    pub fn iter(&self) -> DeferredResult<std::slice::Iter<'_, T>> {
        self.items().map(<[T]>::iter)
    }

    /// Take the fetched rows, cloning them only if another handle to the
    /// same placeholder is still alive.
    pub fn into_items(self) -> DeferredResult<Vec<T>>
    where
        T: Clone,
    {
        match Arc::try_unwrap(self.items) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.get().cloned(),
        }
        .ok_or(DeferredError::PrematureRead("values"))
    }
}

impl<T> Clone for FutureQuery<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FutureQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.items.get() {
            Some(items) => f.debug_tuple("FutureQuery").field(items).finish(),
            None => f.write_str("FutureQuery(<pending>)"),
        }
    }
}

/// A single deferred value.
///
/// Resolves to the first row of its query, or to `T::default()` when the
/// query returned no rows.
pub struct FutureValue<T> {
    value: Arc<OnceLock<T>>,
}

impl<T> FutureValue<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn cell(&self) -> Arc<OnceLock<T>> {
        Arc::clone(&self.value)
    }

    pub fn has_value(&self) -> bool {
        self.value.get().is_some()
    }

    /// The fetched value. Fails until the owning batch has executed.
    pub fn value(&self) -> DeferredResult<&T> {
        self.value
            .get()
            .ok_or(DeferredError::PrematureRead("value"))
    }

    pub fn into_value(self) -> DeferredResult<T>
    where
        T: Clone,
    {
        match Arc::try_unwrap(self.value) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.get().cloned(),
        }
        .ok_or(DeferredError::PrematureRead("value"))
    }
}

impl<T> Clone for FutureValue<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FutureValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.get() {
            Some(value) => f.debug_tuple("FutureValue").field(value).finish(),
            None => f.write_str("FutureValue(<pending>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_before_fill() {
        let query: FutureQuery<i32> = FutureQuery::new();
        assert!(!query.has_value());
        assert!(matches!(
            query.items(),
            Err(DeferredError::PrematureRead("values"))
        ));
        assert!(query.iter().is_err());

        let value: FutureValue<i32> = FutureValue::new();
        let err = value.value().unwrap_err();
        assert_eq!(err.to_string(), "value read before the batch was executed");
    }

    #[test]
    fn test_clones_share_the_cell() {
        let query: FutureQuery<&str> = FutureQuery::new();
        let other = query.clone();
        query.cell().set(vec!["a", "b"]).unwrap();

        assert!(other.has_value());
        assert_eq!(other.iter().unwrap().count(), 2);
        assert_eq!(format!("{:?}", other), "FutureQuery([\"a\", \"b\"])");
    }

    #[test]
    fn test_into_value_with_live_clone() {
        let value: FutureValue<String> = FutureValue::new();
        let keep = value.clone();
        value.cell().set("x".to_string()).unwrap();

        assert_eq!(value.into_value().unwrap(), "x");
        assert_eq!(keep.into_value().unwrap(), "x");
    }

    #[test]
    fn test_pending_debug() {
        let value: FutureValue<i64> = FutureValue::new();
        assert_eq!(format!("{:?}", value), "FutureValue(<pending>)");
    }
}
