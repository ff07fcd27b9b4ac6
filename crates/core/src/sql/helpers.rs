//! SQL text helpers: predicate joining, conflict clauses, inline literal
//! fragments, `VALUES` lists, array text and partition DDL.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};

use super::value::{rfc3339, SqlValue};
use crate::constants::{DATE_FORMAT, DB_TIMESTAMPTZ_FORMAT, TRUE_PREDICATE};
use crate::errors::ArrayParseError;

/// Joins raw predicates with `AND`; an empty list yields `1=1`.
pub fn and_where<S: AsRef<str>>(wheres: &[S]) -> String {
    if wheres.is_empty() {
        return TRUE_PREDICATE.to_string();
    }
    wheres
        .iter()
        .map(|w| w.as_ref())
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Assignment list for `ON CONFLICT ... DO UPDATE SET`.
///
/// Every column of `headers` that is not a primary key is assigned either
/// its expression from `merge_strategy` or `excluded.<column>`.
pub fn update_clause<S: AsRef<str>>(
    headers: &[S],
    pks: &[S],
    merge_strategy: &HashMap<String, String>,
) -> String {
    let pks: HashSet<&str> = pks.iter().map(|p| p.as_ref()).collect();
    headers
        .iter()
        .map(|h| h.as_ref())
        .filter(|h| !pks.contains(h))
        .map(|col| match merge_strategy.get(col) {
            Some(expr) => format!("{col}={expr}"),
            None => format!("{col}=excluded.{col}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Full conflict clause: `ON CONFLICT (pks) DO UPDATE SET ...`.
pub fn on_conflict_update<S: AsRef<str>>(
    headers: &[S],
    pks: &[S],
    merge_strategy: &HashMap<String, String>,
) -> String {
    let keys: Vec<&str> = pks.iter().map(|p| p.as_ref()).collect();
    format!(
        "ON CONFLICT ({}) DO UPDATE SET {}",
        keys.join(","),
        update_clause(headers, pks, merge_strategy)
    )
}

/// `a=excluded.a, b=excluded.b` for every column.
pub fn upsert_query<S: AsRef<str>>(cols: &[S]) -> String {
    cols.iter()
        .map(|c| format!("{0}=excluded.{0}", c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn select_str<S: AsRef<str>>(cols: &[S]) -> String {
    cols.iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Inline equality fragment. Arrays become an `IN` list.
pub fn eq_literal(name: &str, value: &SqlValue) -> String {
    match value {
        SqlValue::Array(array) => in_literal(name, &array_items(array)),
        other => format!("{name} = {}", other.render_literal()),
    }
}

/// Inline `IN` fragment.
pub fn in_literal(name: &str, values: &[SqlValue]) -> String {
    let items: Vec<String> = values.iter().map(SqlValue::render_literal).collect();
    format!("{name} IN ({})", items.join(","))
}

fn array_items(array: &super::value::SqlArray) -> Vec<SqlValue> {
    use super::value::SqlArray;
    match array {
        SqlArray::Int(v) => v.iter().copied().map(SqlValue::Int).collect(),
        SqlArray::Float(v) => v.iter().copied().map(SqlValue::Float).collect(),
        SqlArray::Text(v) => v.iter().cloned().map(SqlValue::Text).collect(),
        SqlArray::Bool(v) => v.iter().copied().map(SqlValue::Bool).collect(),
        SqlArray::Timestamp(v) => v.iter().copied().map(SqlValue::Timestamp).collect(),
    }
}

/// Inline `VALUES` relation: `(VALUES (x),(y)) a(label)`.
///
/// With `with_order` every tuple also carries its index and the relation
/// gains a `sort_order` column.
pub fn value_list(values: &[SqlValue], label: &str, with_order: bool) -> String {
    let tuples: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if with_order {
                format!("({},{i})", v.render_literal())
            } else {
                format!("({})", v.render_literal())
            }
        })
        .collect();

    let label = if with_order {
        format!("{label},sort_order")
    } else {
        label.to_string()
    };
    format!("(VALUES {}) a({label})", tuples.join(","))
}

pub fn value_list_table(values: &[SqlValue], label: &str) -> String {
    format!("SELECT * FROM {} ", value_list(values, label, false))
}

/// PostgreSQL array text for mixed values: `{1,2,2020-01-01T00:00:00Z}`.
pub fn db_array_values(values: &[SqlValue]) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|v| match v {
            SqlValue::Text(s) if s.is_empty() => "\"\"".to_string(),
            other => other.to_string(),
        })
        .collect();
    format!("{{{}}}", items.join(","))
}

/// Cross join of ids and time points as an inline relation `(id, time)`.
pub fn time_points_filler<S: AsRef<str>>(ids: &[S], points: &[DateTime<Utc>]) -> String {
    let ids: Vec<&str> = ids.iter().map(|i| i.as_ref()).collect();
    let times: Vec<String> = points.iter().map(rfc3339).collect();
    format!(
        "SELECT id, time FROM \
         (SELECT id FROM UNNEST('{{{}}}'::_varchar) t(id)) a(id) \
         CROSS JOIN \
         (SELECT time FROM UNNEST('{{{}}}'::_timestamptz) t(time)) b(time)",
        ids.join(","),
        times.join(",")
    )
}

/// Nested `JSONB_SET` calls applying every path/value pair to `field`.
/// Text values are written as JSON strings.
pub fn multiple_jsonb_set(field: &str, set_map: &BTreeMap<String, SqlValue>) -> String {
    set_map.iter().fold(field.to_string(), |acc, (path, value)| {
        let json = match value {
            SqlValue::Text(s) => format!("'\"{s}\"'"),
            other => format!("'{other}'"),
        };
        format!("JSONB_SET({acc}, '{path}', {json})")
    })
}

/// `CREATE TABLE IF NOT EXISTS <partition> PARTITION OF <parent> FOR VALUES FROM (..) TO (..)`.
pub fn create_range_partition_sql(
    partition: &str,
    parent: &str,
    from: &SqlValue,
    to: &SqlValue,
) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {partition} PARTITION OF {parent} FOR VALUES FROM ({}) TO ({})",
        from.render_literal(),
        to.render_literal()
    )
}

/// `CREATE TABLE IF NOT EXISTS <partition> PARTITION OF <parent> FOR VALUES IN (..)`.
pub fn create_list_partition_sql(partition: &str, parent: &str, value: &SqlValue) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {partition} PARTITION OF {parent} FOR VALUES IN ({})",
        value.render_literal()
    )
}

/// Element types readable from PostgreSQL array text.
pub trait FromArrayToken: Sized {
    fn from_token(token: &str) -> Result<Self, ArrayParseError>;
}

impl FromArrayToken for String {
    fn from_token(token: &str) -> Result<Self, ArrayParseError> {
        Ok(token.to_string())
    }
}

impl FromArrayToken for i64 {
    fn from_token(token: &str) -> Result<Self, ArrayParseError> {
        Ok(token.parse()?)
    }
}

impl FromArrayToken for f64 {
    fn from_token(token: &str) -> Result<Self, ArrayParseError> {
        Ok(token.parse()?)
    }
}

impl FromArrayToken for bool {
    fn from_token(token: &str) -> Result<Self, ArrayParseError> {
        match token {
            "t" => Ok(true),
            "f" => Ok(false),
            other => Err(ArrayParseError::Bool(other.to_string())),
        }
    }
}

impl FromArrayToken for DateTime<Utc> {
    fn from_token(token: &str) -> Result<Self, ArrayParseError> {
        let token = token.replace('"', "");
        if let Ok(t) = DateTime::parse_from_str(&token, DB_TIMESTAMPTZ_FORMAT) {
            return Ok(t.with_timezone(&Utc));
        }
        if let Ok(t) = DateTime::parse_from_rfc3339(&token) {
            return Ok(t.with_timezone(&Utc));
        }
        if let Some(t) = NaiveDate::parse_from_str(&token, DATE_FORMAT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(t.and_utc());
        }
        Err(ArrayParseError::Timestamp(token))
    }
}

/// Comma separated one-level array tokens, trimmed.
fn array_tokens(repr: &str) -> Vec<&str> {
    let repr = repr.trim_matches(',').trim_matches('{').trim_matches('}');
    if repr.is_empty() {
        return Vec::new();
    }
    repr.split(',').map(str::trim).collect()
}

/// Parses the text form of a one-dimensional PostgreSQL array.
pub fn parse_db_array<T: FromArrayToken>(repr: &str) -> Result<Vec<T>, ArrayParseError> {
    array_tokens(repr).into_iter().map(T::from_token).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_and_where() {
        assert_eq!(and_where::<&str>(&[]), "1=1");
        assert_eq!(and_where(&["a = 1", "b = 2"]), "a = 1 AND b = 2");
    }

    #[test]
    fn test_update_clause_respects_merge_strategy() {
        let mut merge = HashMap::new();
        merge.insert("total".to_string(), "t.total + excluded.total".to_string());
        let clause = update_clause(&["id", "name", "total"], &["id"], &merge);
        assert_eq!(clause, "name=excluded.name, total=t.total + excluded.total");
    }

    #[test]
    fn test_on_conflict_update() {
        let clause = on_conflict_update(&["a", "b", "c"], &["a", "b"], &HashMap::new());
        assert_eq!(clause, "ON CONFLICT (a,b) DO UPDATE SET c=excluded.c");
    }

    #[test]
    fn test_value_list() {
        let values = vec![SqlValue::Timestamp(day(2020, 1, 1)), SqlValue::Timestamp(day(2020, 1, 2))];
        assert_eq!(
            value_list(&values, "t", false),
            "(VALUES ('2020-01-01T00:00:00Z'),('2020-01-02T00:00:00Z')) a(t)"
        );
        assert_eq!(
            value_list(&[SqlValue::Int(5)], "v", true),
            "(VALUES (5,0)) a(v,sort_order)"
        );
    }

    #[test]
    fn test_db_array_values() {
        let ints: Vec<SqlValue> = (1..=5).map(SqlValue::Int).collect();
        assert_eq!(db_array_values(&ints), "{1,2,3,4,5}");

        let t = SqlValue::Timestamp(day(2020, 1, 1));
        assert_eq!(
            db_array_values(&[t.clone(), t]),
            "{2020-01-01T00:00:00Z,2020-01-01T00:00:00Z}"
        );
    }

    #[test]
    fn test_array_tokens() {
        assert_eq!(array_tokens("{1,2,3, 4, 45 ,55}"), vec!["1", "2", "3", "4", "45", "55"]);
        assert!(array_tokens("{}").is_empty());
    }

    #[test]
    fn test_parse_db_array() {
        assert_eq!(parse_db_array::<i64>("{1,2,3,4}").unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(parse_db_array::<f64>("{1,2,3,4}").unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            parse_db_array::<bool>("{t,t,t,f}").unwrap(),
            vec![true, true, true, false]
        );
        assert_eq!(
            parse_db_array::<DateTime<Utc>>("{2020-01-01, 2020-01-01T20:00:00Z}").unwrap(),
            vec![day(2020, 1, 1), Utc.with_ymd_and_hms(2020, 1, 1, 20, 0, 0).unwrap()]
        );
        assert_eq!(
            parse_db_array::<DateTime<Utc>>("{\"2020-01-01 20:00:00+00\"}").unwrap(),
            vec![Utc.with_ymd_and_hms(2020, 1, 1, 20, 0, 0).unwrap()]
        );
        assert!(matches!(
            parse_db_array::<bool>("{t,x}"),
            Err(ArrayParseError::Bool(_))
        ));
    }

    #[test]
    fn test_literal_fragments() {
        assert_eq!(eq_literal("a", &SqlValue::Int(1)), "a = 1");
        assert_eq!(eq_literal("a", &SqlValue::Text("x".into())), "a = 'x'");
        assert_eq!(
            eq_literal("a", &SqlValue::from(vec![1i64, 2])),
            "a IN (1,2)"
        );
        assert_eq!(
            in_literal("b", &[SqlValue::from("x"), SqlValue::from("y")]),
            "b IN ('x','y')"
        );
    }

    #[test]
    fn test_partition_sql() {
        assert_eq!(
            create_range_partition_sql("p.a_1", "common.a", &SqlValue::Int(10), &SqlValue::Int(20)),
            "CREATE TABLE IF NOT EXISTS p.a_1 PARTITION OF common.a FOR VALUES FROM (10) TO (20)"
        );
        assert_eq!(
            create_list_partition_sql("p.a_x", "common.a", &SqlValue::from("x")),
            "CREATE TABLE IF NOT EXISTS p.a_x PARTITION OF common.a FOR VALUES IN ('x')"
        );
    }

    #[test]
    fn test_multiple_jsonb_set() {
        let mut set = BTreeMap::new();
        set.insert("{a,b}".to_string(), SqlValue::Int(1));
        set.insert("{a,c}".to_string(), SqlValue::from("x"));
        assert_eq!(
            multiple_jsonb_set("metric", &set),
            "JSONB_SET(JSONB_SET(metric, '{a,b}', '1'), '{a,c}', '\"x\"')"
        );
    }

    #[test]
    fn test_time_points_filler() {
        let sql = time_points_filler(&["a", "b"], &[day(2020, 1, 1)]);
        assert!(sql.contains("UNNEST('{a,b}'::_varchar)"));
        assert!(sql.contains("UNNEST('{2020-01-01T00:00:00Z}'::_timestamptz)"));
    }
}
