//! Per-call statement builders producing PostgreSQL text with `$n`
//! placeholders and the matching positional arguments.
//!
//! Builders are plain values: every method consumes and returns the builder,
//! so a base statement can be cloned and extended without shared state.

use std::collections::BTreeMap;

use super::value::SqlValue;
use crate::constants::TRUE_PREDICATE;

/// A filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// SQL fragment used verbatim.
    Raw(String),
    /// `column = $n`, or `column IS NULL` for a NULL value.
    Eq(String, SqlValue),
    /// `column IN ($n, ...)`; an empty list matches nothing.
    In(String, Vec<SqlValue>),
}

impl Predicate {
    pub fn raw(sql: impl Into<String>) -> Self {
        Predicate::Raw(sql.into())
    }

    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Predicate::Eq(column.into(), value.into())
    }

    pub fn is_in<V: Into<SqlValue>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    /// Equality predicates for every entry of `map`, in key order.
    pub fn eq_map(map: &BTreeMap<String, SqlValue>) -> Vec<Predicate> {
        map.iter()
            .map(|(column, value)| Predicate::Eq(column.clone(), value.clone()))
            .collect()
    }

    /// Raw predicates from plain SQL fragments.
    pub fn raw_all<S: AsRef<str>>(fragments: &[S]) -> Vec<Predicate> {
        fragments
            .iter()
            .map(|f| Predicate::Raw(f.as_ref().to_string()))
            .collect()
    }

    fn render(&self, args: &mut Args) -> String {
        match self {
            Predicate::Raw(sql) => sql.clone(),
            Predicate::Eq(column, value) if value.is_null() => format!("{column} IS NULL"),
            Predicate::Eq(column, value) => format!("{column} = {}", args.push(value.clone())),
            Predicate::In(_, values) if values.is_empty() => "(1=0)".to_string(),
            Predicate::In(column, values) => {
                let placeholders: Vec<String> =
                    values.iter().map(|v| args.push(v.clone())).collect();
                format!("{column} IN ({})", placeholders.join(","))
            }
        }
    }
}

/// Positional argument accumulator handing out `$n` placeholders.
#[derive(Debug, Default)]
struct Args {
    values: Vec<SqlValue>,
}

impl Args {
    fn push(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }
}

fn render_where(predicates: &[Predicate], args: &mut Args) -> String {
    if predicates.is_empty() {
        return TRUE_PREDICATE.to_string();
    }
    predicates
        .iter()
        .map(|p| p.render(args))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// `SELECT` statement.
#[derive(Debug, Clone, Default)]
pub struct Select {
    columns: Vec<String>,
    from: String,
    predicates: Vec<Predicate>,
    order_by: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Select {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn from(mut self, table: &str) -> Self {
        self.from = table.to_string();
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn filters(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn order_by<S: AsRef<str>>(mut self, order: &[S]) -> Self {
        self.order_by
            .extend(order.iter().map(|o| o.as_ref().to_string()));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The matching `SELECT COUNT(*)` over the same table and predicates,
    /// without ordering or pagination.
    pub fn count(&self) -> Select {
        Select {
            columns: vec!["COUNT(*)".to_string()],
            from: self.from.clone(),
            predicates: self.predicates.clone(),
            ..Default::default()
        }
    }

    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut args = Args::default();
        let mut sql = format!(
            "SELECT {} FROM {} WHERE {}",
            self.columns.join(", "),
            self.from,
            render_where(&self.predicates, &mut args)
        );
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(","));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        (sql, args.values)
    }
}

/// Multi-row `INSERT` statement with an optional trailing clause
/// (`ON CONFLICT ...`, `RETURNING ...`).
#[derive(Debug, Clone)]
pub struct Insert {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    suffix: Option<String>,
}

impl Insert {
    pub fn into_table<S: AsRef<str>>(table: &str, columns: &[S]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
            suffix: None,
        }
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.suffix = (!suffix.is_empty()).then_some(suffix);
        self
    }

    pub fn values(mut self, row: Vec<SqlValue>) -> Self {
        self.push_row(row);
        self
    }

    /// Appends one tuple in place.
    pub fn push_row(&mut self, row: Vec<SqlValue>) {
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut args = Args::default();
        let tuples: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                let placeholders: Vec<String> =
                    row.iter().map(|v| args.push(v.clone())).collect();
                format!("({})", placeholders.join(","))
            })
            .collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            self.columns.join(","),
            tuples.join(",")
        );
        if let Some(suffix) = &self.suffix {
            sql.push(' ');
            sql.push_str(suffix);
        }
        (sql, args.values)
    }
}

/// `UPDATE` statement. Assignments keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct Update {
    table: String,
    sets: Vec<(String, SqlValue)>,
    predicates: Vec<Predicate>,
}

impl Update {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.sets.push((column.into(), value.into()));
        self
    }

    pub fn set_map(mut self, sets: &BTreeMap<String, SqlValue>) -> Self {
        self.sets
            .extend(sets.iter().map(|(c, v)| (c.clone(), v.clone())));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn filters(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut args = Args::default();
        let assignments: Vec<String> = self
            .sets
            .iter()
            .map(|(column, value)| format!("{column} = {}", args.push(value.clone())))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table,
            assignments.join(", "),
            render_where(&self.predicates, &mut args)
        );
        (sql, args.values)
    }
}

/// `DELETE` statement.
#[derive(Debug, Clone, Default)]
pub struct Delete {
    table: String,
    predicates: Vec<Predicate>,
}

impl Delete {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn filters(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut args = Args::default();
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            self.table,
            render_where(&self.predicates, &mut args)
        );
        (sql, args.values)
    }
}
