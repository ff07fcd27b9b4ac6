//! Core error types for dbkit.
//!
//! This module defines database-agnostic error types. Driver-specific errors
//! (from Diesel, r2d2, libpq) are converted to these types by the storage layer.

use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

use crate::config::ConfigError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the helpers in this crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    /// A row handed to the bulk writer does not match the declared column count.
    #[error("args size not consistent: expected {expected} values, got {actual}")]
    RowWidthMismatch { expected: usize, actual: usize },

    /// The final flush of a bulk insert failed. Query and arguments are
    /// truncated previews, never the full statement.
    #[error("err: {source}, query: {query_preview}, args: {args_preview}")]
    Batch {
        #[source]
        source: Box<Error>,
        query_preview: String,
        args_preview: String,
    },

    #[error("Partition setup failed: {0}")]
    PartitionSetup(String),

    #[error("Table name '{0}' must be schema qualified")]
    InvalidTableName(String),

    #[error("Partition modulus must be positive, got {0}")]
    InvalidModulus(i64),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to parse database array: {0}")]
    ArrayParse(#[from] ArrayParseError),
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert driver errors into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A statement was rejected by the database.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Errors raised while parsing the text form of a PostgreSQL array.
#[derive(Error, Debug)]
pub enum ArrayParseError {
    #[error("invalid integer token: {0}")]
    Int(#[from] ParseIntError),

    #[error("invalid float token: {0}")]
    Float(#[from] ParseFloatError),

    #[error("unrecognised token {0} in bool array")]
    Bool(String),

    #[error("unrecognised timestamp token {0}")]
    Timestamp(String),
}

impl Error {
    /// True when the error is a database `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Database(DatabaseError::NotFound(_)))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
