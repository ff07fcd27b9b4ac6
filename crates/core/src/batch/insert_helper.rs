use log::debug;

use super::budget::PlaceholderBudget;
use crate::constants::ERROR_PREVIEW_LEN;
use crate::errors::{Error, Result};
use crate::runner::SqlRunner;
use crate::sql::{Insert, SqlValue};

/// Accumulates rows into one multi-row `INSERT` and executes it whenever the
/// parameter count passes the flush threshold.
///
/// Bound to one table, column list and trailing clause for the duration of
/// a single bulk write. Rows that were flushed before a later failure stay
/// written; wrap the runner in a transaction for all-or-nothing behaviour.
pub struct InsertHelper<'a, R: SqlRunner + ?Sized> {
    base: Insert,
    current: Insert,
    runner: &'a mut R,
    width: usize,
    budget: PlaceholderBudget,
    flushes: usize,
}

impl<'a, R: SqlRunner + ?Sized> InsertHelper<'a, R> {
    /// `suffix` is appended verbatim after the `VALUES` list, typically an
    /// `ON CONFLICT` clause; pass an empty string for none.
    pub fn new<S: AsRef<str>>(table: &str, columns: &[S], suffix: &str, runner: &'a mut R) -> Self {
        let base = Insert::into_table(table, columns).suffix(suffix);
        Self {
            current: base.clone(),
            width: columns.len(),
            base,
            runner,
            budget: PlaceholderBudget::default(),
            flushes: 0,
        }
    }

    /// Appends one row. The row must have exactly one value per column;
    /// otherwise nothing is recorded and `RowWidthMismatch` is returned.
    ///
    /// When the accumulated parameters pass the flush threshold the pending
    /// statement is executed and the helper starts over. If that execution
    /// fails the pending statement is kept as is and the error is returned.
    pub fn add(&mut self, values: Vec<SqlValue>) -> Result<()> {
        if values.len() != self.width {
            return Err(Error::RowWidthMismatch {
                expected: self.width,
                actual: values.len(),
            });
        }
        self.current.push_row(values);
        self.budget.charge(self.width);

        if self.budget.exceeds_flush_threshold() {
            let (sql, args) = self.current.to_sql();
            self.runner.execute(&sql, &args)?;
            debug!(
                "Flushed {} rows ({} parameters)",
                self.current.row_count(),
                args.len()
            );
            self.current = self.base.clone();
            self.budget.reset();
            self.flushes += 1;
        }
        Ok(())
    }

    /// Executes whatever is still pending. Failures carry a bounded preview
    /// of the statement and its arguments.
    pub fn finish(self) -> Result<()> {
        if self.budget.is_empty() {
            return Ok(());
        }
        let (sql, args) = self.current.to_sql();
        self.runner
            .execute(&sql, &args)
            .map_err(|e| Error::Batch {
                source: Box::new(e),
                query_preview: truncate_chars(&sql, ERROR_PREVIEW_LEN).to_string(),
                args_preview: preview_args(&args, ERROR_PREVIEW_LEN),
            })?;
        debug!("Flushed final {} rows", self.current.row_count());
        Ok(())
    }

    /// Parameters accumulated since the last flush.
    pub fn pending_params(&self) -> usize {
        self.budget.used()
    }

    pub fn pending_rows(&self) -> usize {
        self.current.row_count()
    }

    /// Number of statements executed by `add` so far.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// First `max` arguments, each cut to `max` characters.
fn preview_args(args: &[SqlValue], max: usize) -> String {
    let shown: Vec<String> = args
        .iter()
        .take(max)
        .map(|arg| truncate_chars(&arg.to_string(), max).to_string())
        .collect();
    format!("[{}]", shown.join(" "))
}
