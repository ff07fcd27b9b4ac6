//! SQL building blocks: the value model, statement builders and text helpers.

pub mod builder;
pub mod helpers;
pub mod value;

pub use builder::{Delete, Insert, Predicate, Select, Update};
pub use helpers::*;
pub use value::{quote, SqlArray, SqlKind, SqlValue, ToSqlValue};
