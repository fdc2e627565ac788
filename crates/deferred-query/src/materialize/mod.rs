//! Turning a result set into typed elements
//!
//! Every element type declares a [`RowShape`] that picks one of three
//! strategies:
//!
//! - **Positional**: tuples (and records built from one) read columns by
//!   ordinal. The column count must equal the tuple arity.
//! - **Named**: records read each column into the field of the same name and
//!   ignore columns with no matching field. Implement with
//!   [`impl_named_record!`](crate::impl_named_record).
//! - **Scalar**: primitives read the single column of each row. A null maps
//!   to the type's default (`None` for options, zero for numbers).
//!
//! Types with no [`FromResultRow`] impl cannot be registered at all.

use deferred_core::{DbError, MultiResultCursor, Row, Value};

use crate::{DeferredError, DeferredResult};


/// Materialization strategy of an element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    Positional,
    Named,
    Scalar,
}

/// An element type that can be built from one result row
pub trait FromResultRow: Sized {
    const SHAPE: RowShape;

    /// Required column count for positional shapes
    const ARITY: Option<usize> = None;

    fn from_result_row(row: &Row) -> DeferredResult<Self>;
}

/// A single column value converted to a Rust type.
///
/// Plain types reject nulls. `Option<T>` maps a null to `None`.
pub trait FromColumn: Sized {
    const EXPECTED: &'static str;

    fn from_column(column: &str, value: &Value) -> DeferredResult<Self>;
}

/// Drain the current result set of `cursor` into a vector of `T`.
///
/// The cursor is left positioned after the last row of the set.
pub fn materialize<T: FromResultRow>(cursor: &mut MultiResultCursor) -> DeferredResult<Vec<T>> {
    check_shape::<T>(cursor.column_count())?;

    let mut items = Vec::new();
    while cursor.next_row() {
        let row = cursor
            .current_row()
            .ok_or_else(|| DbError::Query("cursor lost its row position".into()))?;
        items.push(T::from_result_row(row)?);
    }
    Ok(items)
}

fn check_shape<T: FromResultRow>(columns: usize) -> DeferredResult<()> {
    let expected = match T::SHAPE {
        RowShape::Scalar => Some(1),
        RowShape::Positional => T::ARITY,
        RowShape::Named => None,
    };
    match expected {
        Some(expected) if expected != columns => Err(shape_error::<T>(expected, columns)),
        _ => Ok(()),
    }
}

fn shape_error<T>(expected: usize, actual: usize) -> DeferredError {
    DeferredError::UnsupportedShape {
        type_name: std::any::type_name::<T>(),
        reason: format!("expected {} column(s), result set has {}", expected, actual),
    }
}

fn single_column<T>(row: &Row) -> DeferredResult<(&str, &Value)> {
    match (row.columns(), row.values.as_slice()) {
        ([column], [value]) => Ok((column.as_str(), value)),
        _ => Err(shape_error::<T>(1, row.len())),
    }
}

fn int_value<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    value.as_i64().and_then(|v| T::try_from(v).ok())
}

fn bool_value(value: &Value) -> Option<bool> {
    value.as_bool()
}

fn i64_value(value: &Value) -> Option<i64> {
    value.as_i64()
}

fn f64_value(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn f32_value(value: &Value) -> Option<f32> {
    value.as_f64().map(|v| v as f32)
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) | Value::Decimal(s) => Some(s.clone()),
        _ => None,
    }
}

fn bytes_value(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Bytes(b) => Some(b.clone()),
        _ => None,
    }
}

fn uuid_value(value: &Value) -> Option<uuid::Uuid> {
    match value {
        Value::Uuid(u) => Some(*u),
        Value::String(s) => uuid::Uuid::parse_str(s).ok(),
        Value::Bytes(b) => uuid::Uuid::from_slice(b).ok(),
        _ => None,
    }
}

fn date_value(value: &Value) -> Option<chrono::NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date()),
        Value::String(s) => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn datetime_value(value: &Value) -> Option<chrono::NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::String(s) => chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok(),
        _ => None,
    }
}

macro_rules! scalar_types {
    ($($ty:ty => $expected:literal, $convert:expr;)*) => {$(
        impl FromColumn for $ty {
            const EXPECTED: &'static str = $expected;

            fn from_column(column: &str, value: &Value) -> DeferredResult<Self> {
                $convert(value).ok_or_else(|| DeferredError::conversion(column, $expected, value))
            }
        }

        impl FromColumn for Option<$ty> {
            const EXPECTED: &'static str = concat!("nullable ", $expected);

            fn from_column(column: &str, value: &Value) -> DeferredResult<Self> {
                if value.is_null() {
                    return Ok(None);
                }
                <$ty as FromColumn>::from_column(column, value).map(Some)
            }
        }

        impl FromResultRow for $ty {
            const SHAPE: RowShape = RowShape::Scalar;

            fn from_result_row(row: &Row) -> DeferredResult<Self> {
                let (column, value) = single_column::<Self>(row)?;
                if value.is_null() {
                    return Ok(<$ty as Default>::default());
                }
                <$ty as FromColumn>::from_column(column, value)
            }
        }

        impl FromResultRow for Option<$ty> {
            const SHAPE: RowShape = RowShape::Scalar;

            fn from_result_row(row: &Row) -> DeferredResult<Self> {
                let (column, value) = single_column::<Self>(row)?;
                <Option<$ty> as FromColumn>::from_column(column, value)
            }
        }
    )*};
}

scalar_types! {
    bool => "bool", bool_value;
    i8 => "i8", int_value::<i8>;
    i16 => "i16", int_value::<i16>;
    i32 => "i32", int_value::<i32>;
    i64 => "i64", i64_value;
    f32 => "f32", f32_value;
    f64 => "f64", f64_value;
    String => "string", string_value;
    Vec<u8> => "bytes", bytes_value;
    uuid::Uuid => "uuid", uuid_value;
    chrono::NaiveDate => "date", date_value;
    chrono::NaiveDateTime => "datetime", datetime_value;
}

macro_rules! tuple_rows {
    ($($arity:literal => ($($name:ident : $idx:tt),+);)*) => {$(
        impl<$($name: FromColumn),+> FromResultRow for ($($name,)+) {
            const SHAPE: RowShape = RowShape::Positional;
            const ARITY: Option<usize> = Some($arity);

            fn from_result_row(row: &Row) -> DeferredResult<Self> {
                if row.len() != $arity {
                    return Err(shape_error::<Self>($arity, row.len()));
                }
                let columns = row.columns();
                Ok(($($name::from_column(&columns[$idx], &row.values[$idx])?,)+))
            }
        }
    )*};
}

tuple_rows! {
    1 => (A: 0);
    2 => (A: 0, B: 1);
    3 => (A: 0, B: 1, C: 2);
    4 => (A: 0, B: 1, C: 2, D: 3);
    5 => (A: 0, B: 1, C: 2, D: 3, E: 4);
    6 => (A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
    7 => (A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
    8 => (A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
}

/// Implement [`FromResultRow`](crate::FromResultRow) for a record whose
/// fields are filled by column name.
///
/// The record must implement `Default`. Fields without a matching column
/// keep their default and columns without a matching field are ignored.
///
/// ```
/// use deferred_query::impl_named_record;
///
/// #[derive(Debug, Default)]
/// struct Customer {
///     id: i64,
///     email: Option<String>,
/// }
///
/// impl_named_record!(Customer { id, email });
/// ```
#[macro_export]
macro_rules! impl_named_record {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::FromResultRow for $ty {
            const SHAPE: $crate::RowShape = $crate::RowShape::Named;

            fn from_result_row(row: &$crate::Row) -> $crate::DeferredResult<Self> {
                let mut record = <$ty as ::core::default::Default>::default();
                for (column, value) in row.iter() {
                    match column {
                        $(stringify!($field) => {
                            record.$field = $crate::FromColumn::from_column(column, value)?;
                        })+
                        _ => {}
                    }
                }
                Ok(record)
            }
        }
    };
}

/// Implement [`FromResultRow`](crate::FromResultRow) for a record built from
/// a positional tuple through its `From` impl.
///
/// ```
/// use deferred_query::impl_positional_record;
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl From<(i32, i32)> for Point {
///     fn from((x, y): (i32, i32)) -> Self {
///         Self { x, y }
///     }
/// }
///
/// impl_positional_record!(Point => (i32, i32));
/// ```
#[macro_export]
macro_rules! impl_positional_record {
    ($ty:ty => ($($arg:ty),+ $(,)?)) => {
        impl $crate::FromResultRow for $ty {
            const SHAPE: $crate::RowShape = $crate::RowShape::Positional;
            const ARITY: ::core::option::Option<usize> =
                <($($arg,)+) as $crate::FromResultRow>::ARITY;

            fn from_result_row(row: &$crate::Row) -> $crate::DeferredResult<Self> {
                <($($arg,)+) as $crate::FromResultRow>::from_result_row(row)
                    .map(<$ty as ::core::convert::From<($($arg,)+)>>::from)
            }
        }
    };
}
