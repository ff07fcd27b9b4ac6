//! Binds [`SqlValue`] arguments onto raw Diesel queries.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{
    Array, BigInt, Bool, Date, Double, Jsonb, Nullable, Text, Timestamptz, Uuid as SqlUuid,
};
use dbkit_core::{SqlArray, SqlKind, SqlValue};

pub type PgQuery<'f> = BoxedSqlQuery<'f, Pg, SqlQuery>;

/// Boxed query for `sql` with every argument bound in order.
pub fn bind_all<'f>(sql: &str, args: &[SqlValue]) -> PgQuery<'f> {
    args.iter()
        .fold(diesel::sql_query(sql).into_boxed::<Pg>(), bind_value)
}

fn bind_null<'f>(query: PgQuery<'f>, kind: SqlKind) -> PgQuery<'f> {
    match kind {
        SqlKind::Int => query.bind::<Nullable<BigInt>, _>(None::<i64>),
        SqlKind::Float => query.bind::<Nullable<Double>, _>(None::<f64>),
        SqlKind::Text => query.bind::<Nullable<Text>, _>(None::<String>),
        SqlKind::Bool => query.bind::<Nullable<Bool>, _>(None::<bool>),
        SqlKind::Timestamp => query.bind::<Nullable<Timestamptz>, _>(None::<DateTime<Utc>>),
        SqlKind::Date => query.bind::<Nullable<Date>, _>(None::<NaiveDate>),
        SqlKind::Uuid => query.bind::<Nullable<SqlUuid>, _>(None::<uuid::Uuid>),
        SqlKind::Json => query.bind::<Nullable<Jsonb>, _>(None::<serde_json::Value>),
        SqlKind::IntArray => query.bind::<Nullable<Array<BigInt>>, _>(None::<Vec<i64>>),
        SqlKind::FloatArray => query.bind::<Nullable<Array<Double>>, _>(None::<Vec<f64>>),
        SqlKind::TextArray => query.bind::<Nullable<Array<Text>>, _>(None::<Vec<String>>),
        SqlKind::BoolArray => query.bind::<Nullable<Array<Bool>>, _>(None::<Vec<bool>>),
        SqlKind::TimestampArray => {
            query.bind::<Nullable<Array<Timestamptz>>, _>(None::<Vec<DateTime<Utc>>>)
        }
    }
}

fn bind_value<'f>(query: PgQuery<'f>, value: &SqlValue) -> PgQuery<'f> {
    match value {
        SqlValue::Null(kind) => bind_null(query, *kind),
        SqlValue::Int(v) => query.bind::<BigInt, _>(*v),
        SqlValue::Float(v) => query.bind::<Double, _>(*v),
        SqlValue::Text(v) => query.bind::<Text, _>(v.clone()),
        SqlValue::Bool(v) => query.bind::<Bool, _>(*v),
        SqlValue::Timestamp(v) => query.bind::<Timestamptz, _>(*v),
        SqlValue::Date(v) => query.bind::<Date, _>(*v),
        SqlValue::Uuid(v) => query.bind::<SqlUuid, _>(*v),
        SqlValue::Json(v) => query.bind::<Jsonb, _>(v.clone()),
        SqlValue::Array(array) => match array {
            SqlArray::Int(v) => query.bind::<Array<BigInt>, _>(v.clone()),
            SqlArray::Float(v) => query.bind::<Array<Double>, _>(v.clone()),
            SqlArray::Text(v) => query.bind::<Array<Text>, _>(v.clone()),
            SqlArray::Bool(v) => query.bind::<Array<Bool>, _>(v.clone()),
            SqlArray::Timestamp(v) => query.bind::<Array<Timestamptz>, _>(v.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::debug_query;

    #[test]
    fn test_binds_render_in_order() {
        let args = vec![
            SqlValue::Int(7),
            SqlValue::Null(SqlKind::Text),
            SqlValue::Array(SqlArray::Text(vec!["a".into(), "b".into()])),
        ];
        let query = bind_all("INSERT INTO t (a,b,c) VALUES ($1,$2,$3)", &args);
        let rendered = debug_query::<Pg, _>(&query).to_string();
        assert!(rendered.starts_with("INSERT INTO t (a,b,c) VALUES ($1,$2,$3)"));
        assert!(rendered.contains("7"));
        assert!(rendered.contains("None"));
    }
}
