//! Closed value model for positional arguments and SQL literals.

use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The SQL type a value binds as. Carried by NULLs so they can be bound
/// with a concrete parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlKind {
    Int,
    Float,
    Text,
    Bool,
    Timestamp,
    Date,
    Uuid,
    Json,
    IntArray,
    FloatArray,
    TextArray,
    BoolArray,
    TimestampArray,
}

/// One-dimensional array argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlArray {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
    Bool(Vec<bool>),
    Timestamp(Vec<DateTime<Utc>>),
}

/// A single positional argument or literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null(SqlKind),
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Uuid(Uuid),
    Json(serde_json::Value),
    Array(SqlArray),
}

impl SqlArray {
    pub fn kind(&self) -> SqlKind {
        match self {
            SqlArray::Int(_) => SqlKind::IntArray,
            SqlArray::Float(_) => SqlKind::FloatArray,
            SqlArray::Text(_) => SqlKind::TextArray,
            SqlArray::Bool(_) => SqlKind::BoolArray,
            SqlArray::Timestamp(_) => SqlKind::TimestampArray,
        }
    }

    /// PostgreSQL array text form, e.g. `{1,2,3}`.
    pub fn to_pg_text(&self) -> String {
        let items: Vec<String> = match self {
            SqlArray::Int(v) => v.iter().map(i64::to_string).collect(),
            SqlArray::Float(v) => v.iter().map(f64::to_string).collect(),
            SqlArray::Text(v) => v
                .iter()
                .map(|s| if s.is_empty() { "\"\"".to_string() } else { s.clone() })
                .collect(),
            SqlArray::Bool(v) => v.iter().map(|b| if *b { "t" } else { "f" }.to_string()).collect(),
            SqlArray::Timestamp(v) => v.iter().map(rfc3339).collect(),
        };
        format!("{{{}}}", items.join(","))
    }
}

impl SqlValue {
    pub fn kind(&self) -> SqlKind {
        match self {
            SqlValue::Null(kind) => *kind,
            SqlValue::Int(_) => SqlKind::Int,
            SqlValue::Float(_) => SqlKind::Float,
            SqlValue::Text(_) => SqlKind::Text,
            SqlValue::Bool(_) => SqlKind::Bool,
            SqlValue::Timestamp(_) => SqlKind::Timestamp,
            SqlValue::Date(_) => SqlKind::Date,
            SqlValue::Uuid(_) => SqlKind::Uuid,
            SqlValue::Json(_) => SqlKind::Json,
            SqlValue::Array(a) => a.kind(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Renders the value as inline SQL literal text.
    ///
    /// Text is single-quoted with embedded quotes doubled; timestamps use
    /// RFC 3339 in UTC; arrays use the `'{...}'` text form.
    pub fn render_literal(&self) -> String {
        match self {
            SqlValue::Null(_) => "NULL".to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Text(v) => quote(v),
            SqlValue::Bool(v) => v.to_string(),
            SqlValue::Timestamp(v) => quote(&rfc3339(v)),
            SqlValue::Date(v) => quote(&v.format(crate::constants::DATE_FORMAT).to_string()),
            SqlValue::Uuid(v) => quote(&v.to_string()),
            SqlValue::Json(v) => quote(&v.to_string()),
            SqlValue::Array(a) => quote(&a.to_pg_text()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null(_) => f.write_str("<nil>"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(v) => f.write_str(v),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::Timestamp(v) => f.write_str(&rfc3339(v)),
            SqlValue::Date(v) => write!(f, "{v}"),
            SqlValue::Uuid(v) => write!(f, "{v}"),
            SqlValue::Json(v) => write!(f, "{v}"),
            SqlValue::Array(a) => f.write_str(&a.to_pg_text()),
        }
    }
}

/// Single-quotes `s` for use as a SQL string literal.
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub(crate) fn rfc3339(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Conversion of Rust field types into [`SqlValue`].
pub trait ToSqlValue {
    /// Type used when the value is absent.
    const KIND: SqlKind;

    fn to_sql_value(&self) -> SqlValue;
}

macro_rules! scalar_to_sql_value {
    ($($ty:ty => $kind:ident, |$v:ident| $body:expr;)*) => {
        $(
            impl ToSqlValue for $ty {
                const KIND: SqlKind = SqlKind::$kind;

                fn to_sql_value(&self) -> SqlValue {
                    let $v = self;
                    $body
                }
            }
        )*
    };
}

scalar_to_sql_value! {
    i16 => Int, |v| SqlValue::Int(i64::from(*v));
    i32 => Int, |v| SqlValue::Int(i64::from(*v));
    i64 => Int, |v| SqlValue::Int(*v);
    u32 => Int, |v| SqlValue::Int(i64::from(*v));
    f32 => Float, |v| SqlValue::Float(f64::from(*v));
    f64 => Float, |v| SqlValue::Float(*v);
    bool => Bool, |v| SqlValue::Bool(*v);
    String => Text, |v| SqlValue::Text(v.clone());
    str => Text, |v| SqlValue::Text(v.to_string());
    DateTime<Utc> => Timestamp, |v| SqlValue::Timestamp(*v);
    NaiveDate => Date, |v| SqlValue::Date(*v);
    Uuid => Uuid, |v| SqlValue::Uuid(*v);
    serde_json::Value => Json, |v| SqlValue::Json(v.clone());
    Vec<i64> => IntArray, |v| SqlValue::Array(SqlArray::Int(v.clone()));
    Vec<i32> => IntArray, |v| SqlValue::Array(SqlArray::Int(v.iter().map(|x| i64::from(*x)).collect()));
    Vec<f64> => FloatArray, |v| SqlValue::Array(SqlArray::Float(v.clone()));
    Vec<String> => TextArray, |v| SqlValue::Array(SqlArray::Text(v.clone()));
    Vec<bool> => BoolArray, |v| SqlValue::Array(SqlArray::Bool(v.clone()));
    Vec<DateTime<Utc>> => TimestampArray, |v| SqlValue::Array(SqlArray::Timestamp(v.clone()));
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    const KIND: SqlKind = T::KIND;

    fn to_sql_value(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null(T::KIND),
        }
    }
}

impl<T: ToSqlValue + ?Sized> ToSqlValue for &T {
    const KIND: SqlKind = T::KIND;

    fn to_sql_value(&self) -> SqlValue {
        (**self).to_sql_value()
    }
}

impl ToSqlValue for SqlValue {
    const KIND: SqlKind = SqlKind::Text;

    fn to_sql_value(&self) -> SqlValue {
        self.clone()
    }
}

macro_rules! from_for_sql_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    value.to_sql_value()
                }
            }
        )*
    };
}

from_for_sql_value!(
    i16, i32, i64, u32, f32, f64, bool, String, &str, DateTime<Utc>, NaiveDate, Uuid,
    serde_json::Value, Vec<i64>, Vec<i32>, Vec<f64>, Vec<String>, Vec<bool>, Vec<DateTime<Utc>>
);

impl<T: ToSqlValue> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.to_sql_value()
    }
}
