//! In-memory runner used by the unit tests.

use std::collections::BTreeSet;

use crate::errors::{DatabaseError, Error, Result};
use crate::runner::{RowLoader, SqlRunner};
use crate::sql::SqlValue;

#[derive(Debug)]
pub struct RecordingRunner<T = ()> {
    pub executed: Vec<(String, Vec<SqlValue>)>,
    pub batches: Vec<String>,
    pub scalar_queries: Vec<(String, Vec<SqlValue>)>,
    pub loads: Vec<(String, Vec<SqlValue>)>,
    /// Value returned by `query_scalar` for non-count queries.
    pub scalar: Option<i64>,
    /// 1-based index of the `execute` call that fails.
    pub fail_execute_at: Option<usize>,
    pub fail_scalar: bool,
    pub fail_batch: bool,
    /// Partition tables created through `CREATE TABLE IF NOT EXISTS`.
    pub tables: BTreeSet<String>,
    pub rows: Vec<T>,
}

impl<T> Default for RecordingRunner<T> {
    fn default() -> Self {
        Self {
            executed: Vec::new(),
            batches: Vec::new(),
            scalar_queries: Vec::new(),
            loads: Vec::new(),
            scalar: None,
            fail_execute_at: None,
            fail_scalar: false,
            fail_batch: false,
            tables: BTreeSet::new(),
            rows: Vec::new(),
        }
    }
}

impl<T> RecordingRunner<T> {
    pub fn with_rows(rows: Vec<T>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    /// Number of value tuples across every executed INSERT.
    pub fn inserted_tuples(&self, width: usize) -> usize {
        self.executed.iter().map(|(_, args)| args.len() / width).sum()
    }
}

fn rejected(msg: &str) -> Error {
    Error::Database(DatabaseError::QueryFailed(msg.to_string()))
}

fn clause_value(sql: &str, keyword: &str) -> Option<usize> {
    let rest = &sql[sql.find(keyword)? + keyword.len()..];
    rest.split_whitespace().next()?.parse().ok()
}

impl<T> SqlRunner for RecordingRunner<T> {
    fn execute(&mut self, sql: &str, args: &[SqlValue]) -> Result<usize> {
        if self.fail_execute_at == Some(self.executed.len() + 1) {
            return Err(rejected("statement rejected"));
        }
        self.executed.push((sql.to_string(), args.to_vec()));
        Ok(1)
    }

    fn batch_execute(&mut self, sql: &str) -> Result<()> {
        if self.fail_batch {
            return Err(rejected("relation does not exist"));
        }
        self.batches.push(sql.to_string());
        for stmt in sql.split(';') {
            if let Some(rest) = stmt.trim().strip_prefix("CREATE TABLE IF NOT EXISTS ") {
                if let Some(name) = rest.split_whitespace().next() {
                    self.tables.insert(name.to_string());
                }
            }
        }
        Ok(())
    }

    fn query_scalar(&mut self, sql: &str, args: &[SqlValue]) -> Result<Option<i64>> {
        if self.fail_scalar {
            return Err(rejected("sequence does not exist"));
        }
        self.scalar_queries.push((sql.to_string(), args.to_vec()));
        if sql.starts_with("SELECT COUNT(*)") {
            return Ok(Some(self.rows.len() as i64));
        }
        Ok(self.scalar)
    }

    fn query_ids(&mut self, sql: &str, args: &[SqlValue]) -> Result<Vec<i64>> {
        self.execute(sql, args)?;
        let tuples = sql.matches("),(").count() as i64 + 1;
        let first = self.scalar.unwrap_or(0) + 1;
        self.scalar = Some(first + tuples - 1);
        Ok((first..first + tuples).collect())
    }
}

impl<T: Clone> RowLoader<T> for RecordingRunner<T> {
    fn load(&mut self, sql: &str, args: &[SqlValue]) -> Result<Vec<T>> {
        self.loads.push((sql.to_string(), args.to_vec()));
        let offset = clause_value(sql, " OFFSET ").unwrap_or(0);
        let limit = clause_value(sql, " LIMIT ").unwrap_or(usize::MAX);
        Ok(self.rows.iter().skip(offset).take(limit).cloned().collect())
    }
}
