//! Filtered, ordered and paginated reads.
//!
//! List helpers run the page query and a `COUNT(*)` over the exact same
//! predicates, so `total` counts the filtered set rather than the table.

use std::collections::BTreeMap;

use log::error;

use crate::constants::{NOOP_ORDER, TRUE_PREDICATE};
use crate::errors::{DatabaseError, Error, Result};
use crate::page::{Page, Paginated};
use crate::row::{row_columns, SqlRow};
use crate::runner::RowLoader;
use crate::sql::{Predicate, Select, SqlValue};

fn fetch_page<T, R>(runner: &mut R, table: &str, select: Select, page: Page) -> Result<Paginated<T>>
where
    R: RowLoader<T> + ?Sized,
{
    let count = select.count();
    let (sql, args) = select.offset(page.offset()).limit(page.limit()).to_sql();
    let data = runner.load(&sql, &args).inspect_err(|e| {
        error!("error select from {} ({}): {}", table, sql, e);
    })?;

    let (count_sql, count_args) = count.to_sql();
    let total = runner
        .query_scalar(&count_sql, &count_args)
        .inspect_err(|e| error!("error count total of {}: {}", table, e))?
        .unwrap_or(0);

    Ok(Paginated { total, data })
}

/// Lists rows of `table` selecting the columns mapped by `T`.
///
/// `wheres` are raw predicates joined with `AND`; the ordering always ends
/// with the first column so paging is deterministic.
pub fn list_s<T, R, S>(
    runner: &mut R,
    page: Page,
    table: &str,
    wheres: &[S],
    order: &[S],
) -> Result<Paginated<T>>
where
    T: SqlRow + Default,
    R: RowLoader<T> + ?Sized,
    S: AsRef<str>,
{
    let cols = row_columns(&T::default());
    let select = Select::new(&cols)
        .from(table)
        .filters(Predicate::raw_all(wheres))
        .order_by(order)
        .order_by(&["1"]);
    fetch_page(runner, table, select, page)
}

/// Lists `SELECT *` rows whose columns equal the values in `wheres`.
pub fn list_m<T, R, S>(
    runner: &mut R,
    page: Page,
    table: &str,
    wheres: &BTreeMap<String, SqlValue>,
    order: &[S],
) -> Result<Paginated<T>>
where
    R: RowLoader<T> + ?Sized,
    S: AsRef<str>,
{
    let select = Select::new(&["*"])
        .from(table)
        .filters(Predicate::eq_map(wheres))
        .order_by(order);
    fetch_page(runner, table, select, page)
}

/// Lists rows with a caller chosen select list (`*` when empty).
pub fn list_flex<T, R, S>(
    runner: &mut R,
    page: Page,
    table: &str,
    selects: &[S],
    wheres: &[S],
    order: &[S],
) -> Result<Paginated<T>>
where
    R: RowLoader<T> + ?Sized,
    S: AsRef<str>,
{
    let select = if selects.is_empty() {
        Select::new(&["*"])
    } else {
        Select::new(selects)
    };
    let select = select
        .from(table)
        .filters(Predicate::raw_all(wheres))
        .filter(Predicate::raw(TRUE_PREDICATE))
        .order_by(order)
        .order_by(&[NOOP_ORDER]);
    fetch_page(runner, table, select, page)
}

fn first_or_not_found<T>(rows: Vec<T>, table: &str) -> Result<T> {
    rows.into_iter().next().ok_or_else(|| {
        Error::Database(DatabaseError::NotFound(format!(
            "{} in {}",
            std::any::type_name::<T>(),
            table
        )))
    })
}

fn load_all<T, R>(runner: &mut R, table: &str, select: Select) -> Result<Vec<T>>
where
    R: RowLoader<T> + ?Sized,
{
    let (sql, args) = select.to_sql();
    runner
        .load(&sql, &args)
        .inspect_err(|e| error!("error get from {} ({}): {}", table, sql, e))
}

/// First row matching raw predicates.
pub fn get_s<T, R, S>(runner: &mut R, table: &str, wheres: &[S]) -> Result<T>
where
    R: RowLoader<T> + ?Sized,
    S: AsRef<str>,
{
    let select = Select::new(&["*"])
        .from(table)
        .filters(Predicate::raw_all(wheres))
        .limit(1);
    first_or_not_found(load_all(runner, table, select)?, table)
}

/// First row matching equality predicates.
pub fn get_m<T, R>(runner: &mut R, table: &str, wheres: &BTreeMap<String, SqlValue>) -> Result<T>
where
    R: RowLoader<T> + ?Sized,
{
    let select = Select::new(&["*"])
        .from(table)
        .filters(Predicate::eq_map(wheres))
        .limit(1);
    first_or_not_found(load_all(runner, table, select)?, table)
}

pub fn get_many_s<T, R, S>(runner: &mut R, table: &str, wheres: &[S], order: &[S]) -> Result<Vec<T>>
where
    R: RowLoader<T> + ?Sized,
    S: AsRef<str>,
{
    let select = Select::new(&["*"])
        .from(table)
        .filters(Predicate::raw_all(wheres))
        .order_by(order);
    load_all(runner, table, select)
}

pub fn get_many_m<T, R, S>(
    runner: &mut R,
    table: &str,
    wheres: &BTreeMap<String, SqlValue>,
    order: &[S],
) -> Result<Vec<T>>
where
    R: RowLoader<T> + ?Sized,
    S: AsRef<str>,
{
    let select = Select::new(&["*"])
        .from(table)
        .filters(Predicate::eq_map(wheres))
        .order_by(order);
    load_all(runner, table, select)
}

fn exists<R>(runner: &mut R, table: &str, select: Select) -> Result<bool>
where
    R: crate::runner::SqlRunner + ?Sized,
{
    let (sql, args) = select.count().to_sql();
    let count = runner
        .query_scalar(&sql, &args)
        .inspect_err(|e| error!("error check exist in {}: {}", table, e))?;
    Ok(count.unwrap_or(0) > 0)
}

/// Whether any row matches raw predicates.
pub fn exist_s<R, S>(runner: &mut R, table: &str, wheres: &[S]) -> Result<bool>
where
    R: crate::runner::SqlRunner + ?Sized,
    S: AsRef<str>,
{
    let select = Select::new(&["*"]).from(table).filters(Predicate::raw_all(wheres));
    exists(runner, table, select)
}

/// Whether any row matches equality predicates.
pub fn exist_m<R>(runner: &mut R, table: &str, wheres: &BTreeMap<String, SqlValue>) -> Result<bool>
where
    R: crate::runner::SqlRunner + ?Sized,
{
    let select = Select::new(&["*"]).from(table).filters(Predicate::eq_map(wheres));
    exists(runner, table, select)
}
