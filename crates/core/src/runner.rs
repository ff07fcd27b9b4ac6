//! Connection abstraction consumed by every helper in this crate.
//!
//! The crate never opens connections or transactions itself. Callers hand in
//! something that can run statements; passing a transaction makes a whole
//! helper call atomic.

use crate::errors::Result;
use crate::sql::SqlValue;

/// Executes SQL with PostgreSQL positional (`$n`) arguments.
pub trait SqlRunner {
    /// Runs one statement and returns the affected row count.
    fn execute(&mut self, sql: &str, args: &[SqlValue]) -> Result<usize>;

    /// Runs one or more `;` separated statements without arguments.
    fn batch_execute(&mut self, sql: &str) -> Result<()>;

    /// Runs a query producing at most one integer value. `None` when the
    /// query returns no row or a NULL.
    fn query_scalar(&mut self, sql: &str, args: &[SqlValue]) -> Result<Option<i64>>;

    /// Runs a statement whose single result column is an integer id
    /// (`INSERT ... RETURNING id`), returning every id in order.
    fn query_ids(&mut self, sql: &str, args: &[SqlValue]) -> Result<Vec<i64>>;
}

/// A runner able to decode result rows into `T`.
pub trait RowLoader<T>: SqlRunner {
    fn load(&mut self, sql: &str, args: &[SqlValue]) -> Result<Vec<T>>;
}

impl<R: SqlRunner + ?Sized> SqlRunner for &mut R {
    fn execute(&mut self, sql: &str, args: &[SqlValue]) -> Result<usize> {
        (**self).execute(sql, args)
    }

    fn batch_execute(&mut self, sql: &str) -> Result<()> {
        (**self).batch_execute(sql)
    }

    fn query_scalar(&mut self, sql: &str, args: &[SqlValue]) -> Result<Option<i64>> {
        (**self).query_scalar(sql, args)
    }

    fn query_ids(&mut self, sql: &str, args: &[SqlValue]) -> Result<Vec<i64>> {
        (**self).query_ids(sql, args)
    }
}

impl<T, R: RowLoader<T> + ?Sized> RowLoader<T> for &mut R {
    fn load(&mut self, sql: &str, args: &[SqlValue]) -> Result<Vec<T>> {
        (**self).load(sql, args)
    }
}
