//! Errors raised while registering, executing and reading deferred queries

use deferred_core::{DbError, Value};
use thiserror::Error;

use crate::ParamType;

pub type DeferredResult<T> = Result<T, DeferredError>;

#[derive(Debug, Error)]
pub enum DeferredError {
    /// A bound parameter's declared type has no inlining rule.
    #[error("parameter type '{param_type}' having value '{value}' is not supported")]
    UnsupportedParameterType { param_type: ParamType, value: Value },

    /// A bound value does not belong to the parameter's declared type.
    #[error("parameter '{name}' is declared as '{param_type}' but holds a {found} value")]
    ParameterTypeMismatch {
        name: String,
        param_type: ParamType,
        found: &'static str,
    },

    /// The result set cannot be materialized into the requested row shape.
    #[error("unsupported shape for '{type_name}': {reason}")]
    UnsupportedShape {
        type_name: &'static str,
        reason: String,
    },

    /// A column value could not be converted to the target Rust type.
    #[error("cannot read column '{column}' as {expected}: found {found}")]
    Conversion {
        column: String,
        expected: &'static str,
        found: String,
    },

    /// A placeholder was read before the batch it belongs to was executed.
    #[error("{0} read before the batch was executed")]
    PrematureRead(&'static str),

    /// The backend produced a different number of result sets than there
    /// were pending queries.
    #[error("expected {expected} result sets from the batch, got {actual}")]
    ResultSetMismatch { expected: usize, actual: usize },

    /// The query description could not be turned into SQL.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Failure reported by the driver or connection.
    #[error(transparent)]
    Execution(#[from] DbError),
}

impl DeferredError {
    pub(crate) fn conversion(column: &str, expected: &'static str, found: &Value) -> Self {
        Self::Conversion {
            column: column.to_string(),
            expected,
            found: match found {
                Value::Null => "null".to_string(),
                other => format!("{} '{}'", other.type_name(), other),
            },
        }
    }
}
