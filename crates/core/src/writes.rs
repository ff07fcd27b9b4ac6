//! Write helpers: bulk upsert, single and multi-row create, updates and
//! deletes.
//!
//! Every helper runs on the runner it is given and logs failures with the
//! table involved before returning them.

use std::collections::{BTreeMap, HashMap};

use log::error;

use crate::batch::InsertHelper;
use crate::errors::Result;
use crate::row::{extract_columns, row_values, SqlRow};
use crate::runner::SqlRunner;
use crate::sql::{on_conflict_update, Delete, Insert, Predicate, SqlValue, Update};

/// Hook run before inserting into a partitioned table; receives the runner
/// and the parent table name.
pub type PartitionFn<'f, R> = &'f dyn Fn(&mut R, &str) -> Result<()>;

/// Upserts `rows` into `table` through a single [`InsertHelper`].
///
/// Columns come from the first row. On a primary key conflict every non-key
/// column takes its expression from `merge_strategy`, or the incoming value
/// when absent. Empty input executes nothing.
///
/// Not atomic: when a later chunk fails, chunks that were already flushed
/// stay written. Pass a transaction as `runner` for all-or-nothing writes.
pub fn upsert_many_no_partition<R, T, S>(
    runner: &mut R,
    table: &str,
    pks: &[S],
    rows: &[T],
    merge_strategy: &HashMap<String, String>,
) -> Result<()>
where
    R: SqlRunner + ?Sized,
    T: SqlRow,
    S: AsRef<str>,
{
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let (cols, _) = extract_columns::<T, &str>(first, &[]);
    let pks: Vec<&str> = pks.iter().map(|p| p.as_ref()).collect();
    let cols_ref: Vec<&str> = cols.iter().map(String::as_str).collect();
    let merge = on_conflict_update(&cols_ref, &pks, merge_strategy);

    let mut helper = InsertHelper::new(table, &cols, &merge, runner);
    for row in rows {
        if let Err(e) = helper.add(row_values(row)) {
            error!("error save into {}: {}", table, e);
            return Err(e);
        }
    }
    helper.finish().inspect_err(|e| {
        error!("error finish insert many into {}: {}", table, e);
    })
}

/// `RETURNING` clause exposing `column` as the integer `id` column read by
/// [`SqlRunner::query_ids`].
pub fn returning_id_clause(column: &str) -> String {
    format!("RETURNING ({column})::BIGINT AS id")
}

/// Inserts one row. With `returning` set, the value of that column for the
/// new row is returned.
pub fn create<R, T>(
    runner: &mut R,
    table: &str,
    row: &T,
    returning: Option<&str>,
    partition: Option<PartitionFn<'_, R>>,
) -> Result<Option<i64>>
where
    R: SqlRunner + ?Sized,
    T: SqlRow,
{
    if let Some(prepare) = partition {
        prepare(runner, table)?;
    }

    let (cols, vals) = extract_columns::<T, &str>(row, &[]);
    let mut insert = Insert::into_table(table, &cols).values(vals);
    let result = match returning {
        Some(column) => {
            insert = insert.suffix(returning_id_clause(column));
            let (sql, args) = insert.to_sql();
            runner.query_ids(&sql, &args).map(|ids| ids.first().copied())
        }
        None => {
            let (sql, args) = insert.to_sql();
            runner.execute(&sql, &args).map(|_| None)
        }
    };
    result.inspect_err(|e| error!("error create in {}: {}", table, e))
}

/// Inserts every row with a single multi-row statement and returns the
/// `returning` column of each inserted row in order (empty without it).
pub fn create_many<R, T>(
    runner: &mut R,
    table: &str,
    rows: &[T],
    returning: Option<&str>,
    partition: Option<PartitionFn<'_, R>>,
) -> Result<Vec<i64>>
where
    R: SqlRunner + ?Sized,
    T: SqlRow,
{
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    if let Some(prepare) = partition {
        prepare(runner, table)?;
    }

    let (cols, _) = extract_columns::<T, &str>(first, &[]);
    let mut insert = Insert::into_table(table, &cols);
    for row in rows {
        insert.push_row(row_values(row));
    }

    let result = match returning {
        Some(column) => {
            let (sql, args) = insert.suffix(returning_id_clause(column)).to_sql();
            runner.query_ids(&sql, &args)
        }
        None => {
            let (sql, args) = insert.to_sql();
            runner.execute(&sql, &args).map(|_| Vec::new())
        }
    };
    result.inspect_err(|e| error!("error create many in {}: {}", table, e))
}

fn run_update<R: SqlRunner + ?Sized>(runner: &mut R, table: &str, update: Update) -> Result<usize> {
    let (sql, args) = update.to_sql();
    runner
        .execute(&sql, &args)
        .inspect_err(|e| error!("error update {} ({}): {}", table, sql, e))
}

/// Updates rows matching raw SQL predicates.
pub fn update_s<R, S>(
    runner: &mut R,
    table: &str,
    wheres: &[S],
    sets: &BTreeMap<String, SqlValue>,
) -> Result<usize>
where
    R: SqlRunner + ?Sized,
    S: AsRef<str>,
{
    let update = Update::table(table)
        .set_map(sets)
        .filters(Predicate::raw_all(wheres));
    run_update(runner, table, update)
}

/// Updates rows whose columns equal the values in `wheres`.
pub fn update_m<R: SqlRunner + ?Sized>(
    runner: &mut R,
    table: &str,
    wheres: &BTreeMap<String, SqlValue>,
    sets: &BTreeMap<String, SqlValue>,
) -> Result<usize> {
    let update = Update::table(table)
        .set_map(sets)
        .filters(Predicate::eq_map(wheres));
    run_update(runner, table, update)
}

/// Updates every row whose `id` is in `ids`.
pub fn update_more<R: SqlRunner + ?Sized>(
    runner: &mut R,
    table: &str,
    ids: &[i64],
    sets: &BTreeMap<String, SqlValue>,
) -> Result<usize> {
    let update = Update::table(table)
        .set_map(sets)
        .filter(Predicate::is_in("id", ids.iter().copied()));
    run_update(runner, table, update)
}

pub fn update_with_id<R: SqlRunner + ?Sized>(
    runner: &mut R,
    table: &str,
    id: i64,
    sets: &BTreeMap<String, SqlValue>,
) -> Result<usize> {
    let mut wheres = BTreeMap::new();
    wheres.insert("id".to_string(), SqlValue::Int(id));
    update_m(runner, table, &wheres, sets)
}

/// Sets the `is_deleted` flag of one row.
pub fn set_deleted<R: SqlRunner + ?Sized>(
    runner: &mut R,
    table: &str,
    id: i64,
    deleted: bool,
) -> Result<usize> {
    let update = Update::table(table)
        .set("is_deleted", deleted)
        .filter(Predicate::eq("id", id));
    run_update(runner, table, update)
}

/// Sets the `is_active` flag of one row.
pub fn set_active<R: SqlRunner + ?Sized>(
    runner: &mut R,
    table: &str,
    id: i64,
    active: bool,
) -> Result<usize> {
    let update = Update::table(table)
        .set("is_active", active)
        .filter(Predicate::eq("id", id));
    run_update(runner, table, update)
}

/// Deletes rows matching raw SQL predicates. Without predicates nothing is
/// deleted.
pub fn delete<R, S>(runner: &mut R, table: &str, wheres: &[S]) -> Result<usize>
where
    R: SqlRunner + ?Sized,
    S: AsRef<str>,
{
    if wheres.is_empty() {
        return Ok(0);
    }
    let (sql, args) = Delete::from(table).filters(Predicate::raw_all(wheres)).to_sql();
    runner
        .execute(&sql, &args)
        .inspect_err(|e| error!("error delete from {}: {}", table, e))
}
