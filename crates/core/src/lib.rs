//! dbkit core: batched bulk writes and range partition coordination for
//! PostgreSQL.
//!
//! This crate is database-agnostic. It renders SQL and drives a
//! [`SqlRunner`]; the `dbkit-storage-postgres` crate implements the runner
//! on top of a Diesel connection.

pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
pub mod page;
pub mod partition;
pub mod reader;
pub mod row;
pub mod runner;
pub mod sql;
pub mod writes;

#[cfg(test)]
mod test_support;

pub use batch::{close_to_placeholder_limit, InsertHelper, PlaceholderBudget};
pub use config::{Config, ConfigError, DbConfig, Mode, PostgresConfig};
pub use page::{Page, Paginated, NO_PAGINATION};
pub use partition::{prepare_id_partition, IdPartitioner, PartitionDescriptor};
pub use row::{extract_columns, RowEncoder, SqlRow};
pub use runner::{RowLoader, SqlRunner};
pub use sql::{SqlArray, SqlKind, SqlValue, ToSqlValue};
pub use writes::{upsert_many_no_partition, PartitionFn};

// Re-export error types
pub use errors::{DatabaseError, Error, Result};
