//! PostgreSQL storage implementation for dbkit.
//!
//! This crate is the only place in the workspace where Diesel dependencies
//! exist. It provides:
//! - Connection pooling and database provisioning
//! - File based Diesel migrations
//! - [`PgRunner`], the `SqlRunner` used by every `dbkit-core` helper
//!
//! ```text
//!        dbkit-core (SQL rendering, batching, partitions)
//!                  │
//!                  ▼
//!        storage-postgres (this crate)
//!                  │
//!                  ▼
//!              PostgreSQL
//! ```

pub mod bind;
pub mod db;
pub mod errors;
pub mod runner;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, new_db, new_test_db, run_migrations, setup_local_storage,
    with_database, DbConnection, DbPool, DbTransactionExecutor,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use runner::PgRunner;

// Re-export from dbkit-core for convenience
pub use dbkit_core::errors::{DatabaseError, Error, Result};
