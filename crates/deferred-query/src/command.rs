//! Query descriptions as seen by the batching engine
//!
//! The engine never derives SQL itself. It asks a [`QuerySource`] for a
//! [`SqlCommand`] (SQL text plus named, typed parameters) and, for the
//! shaping helpers, asks a [`ComposableQuery`] for a variant with a different
//! projection or row window.

use deferred_core::Value;
use serde::{Deserialize, Serialize};

use crate::DeferredResult;

/// Declared scalar type of a bound parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Real,
    Float,
    Decimal,
    Char,
    VarChar,
    NVarChar,
    Text,
    Date,
    Time,
    DateTime,
    UniqueIdentifier,
    Binary,
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// A named parameter binding
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter {
    /// Placeholder name, including its sigil (`@id`, `:id`). A bare name is
    /// treated as `@name`.
    pub name: String,
    pub param_type: ParamType,
    pub value: Value,
}

impl SqlParameter {
    pub fn new(name: impl Into<String>, param_type: ParamType, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            param_type,
            value: value.into(),
        }
    }

    pub fn bit(name: impl Into<String>, value: bool) -> Self {
        Self::new(name, ParamType::Bit, value)
    }

    pub fn int(name: impl Into<String>, value: i32) -> Self {
        Self::new(name, ParamType::Int, value)
    }

    pub fn bigint(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, ParamType::BigInt, value)
    }

    pub fn float(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, ParamType::Float, value)
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, ParamType::Text, Value::String(value.into()))
    }

    /// The placeholder token this binding replaces
    pub(crate) fn placeholder(&self) -> String {
        if self.name.starts_with('@') || self.name.starts_with(':') {
            self.name.clone()
        } else {
            format!("@{}", self.name)
        }
    }
}

/// Executable SQL text plus its parameter bindings
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlCommand {
    pub sql: String,
    pub parameters: Vec<SqlParameter>,
}

impl SqlCommand {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: SqlParameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Anything that can produce a [`SqlCommand`]
pub trait QuerySource {
    fn build_command(&self) -> DeferredResult<SqlCommand>;
}

impl QuerySource for SqlCommand {
    fn build_command(&self) -> DeferredResult<SqlCommand> {
        Ok(self.clone())
    }
}

impl QuerySource for str {
    fn build_command(&self) -> DeferredResult<SqlCommand> {
        Ok(SqlCommand::new(self))
    }
}

impl QuerySource for String {
    fn build_command(&self) -> DeferredResult<SqlCommand> {
        Ok(SqlCommand::new(self.as_str()))
    }
}

/// A query description that can be reshaped before it is built.
///
/// `skip` and `take` compose the way sequence operators do: skipping after a
/// take shrinks the window, taking after a skip limits what is left.
pub trait ComposableQuery: QuerySource + Clone {
    /// Replace what the query selects
    fn with_projection(&self, projection: Projection) -> Self;

    /// Drop the first `count` rows
    fn skip(&self, count: u64) -> Self;

    /// Keep at most `count` rows
    fn take(&self, count: u64) -> Self;
}

/// What a query selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
    Aggregate(Aggregate),
}

/// Integer width an aggregate is cast to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastWidth {
    Int,
    BigInt,
}

impl CastWidth {
    pub fn sql_type(self) -> &'static str {
        match self {
            CastWidth::Int => "int",
            CastWidth::BigInt => "bigint",
        }
    }
}

/// Scalar aggregate projections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    Sum { column: String, width: CastWidth },
    Count,
    LongCount,
}

impl Aggregate {
    pub fn to_sql(&self) -> String {
        match self {
            Aggregate::Sum { column, width } => {
                format!("CAST(SUM({}) AS {})", column, width.sql_type())
            }
            Aggregate::Count => "COUNT(*)".to_string(),
            Aggregate::LongCount => "CAST(COUNT(*) AS bigint)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_aggregate_sql() {
        let sum = Aggregate::Sum {
            column: "total".into(),
            width: CastWidth::BigInt,
        };
        assert_eq!(sum.to_sql(), "CAST(SUM(total) AS bigint)");
        assert_eq!(Aggregate::Count.to_sql(), "COUNT(*)");
        assert_eq!(Aggregate::LongCount.to_sql(), "CAST(COUNT(*) AS bigint)");
    }

    #[test]
    fn test_placeholder_sigils() {
        assert_eq!(SqlParameter::int("@id", 1).placeholder(), "@id");
        assert_eq!(SqlParameter::int(":id", 1).placeholder(), ":id");
        assert_eq!(SqlParameter::int("id", 1).placeholder(), "@id");
    }

    #[test]
    fn test_raw_sql_is_a_source() {
        let command = "SELECT 1".build_command().unwrap();
        assert_eq!(command, SqlCommand::new("SELECT 1"));
    }

    #[test]
    fn test_param_type_serde_names() {
        let json = serde_json::to_string(&ParamType::NVarChar).unwrap();
        assert_eq!(json, "\"NVarChar\"");
        assert_eq!(ParamType::BigInt.to_string(), "BigInt");
    }
}
