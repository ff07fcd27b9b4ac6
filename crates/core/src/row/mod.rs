//! Row encoding: turns a record into its ordered column names and values.
//!
//! Mappings are declared per type, either by implementing [`SqlRow`] by hand
//! or with the [`sql_row!`](crate::sql_row) macro. Column order is the order
//! in which fields are written, so it is identical for every value of a type.

use std::collections::HashSet;

use crate::sql::{SqlValue, ToSqlValue};

/// A record that can be written as one table row.
pub trait SqlRow {
    /// Writes every mapped field, in declared order, into `out`.
    fn encode(&self, out: &mut RowEncoder);
}

/// Collects columns and values while a record encodes itself.
#[derive(Debug, Default)]
pub struct RowEncoder {
    columns: Vec<String>,
    values: Vec<SqlValue>,
    exclude: HashSet<String>,
}

impl RowEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An encoder that drops the given columns wherever they appear,
    /// flattened records included.
    pub fn excluding<S: AsRef<str>>(exclude: &[S]) -> Self {
        Self {
            exclude: exclude.iter().map(|c| c.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    /// Writes one column.
    pub fn field<V: ToSqlValue + ?Sized>(&mut self, column: &str, value: &V) -> &mut Self {
        if !self.exclude.contains(column) {
            self.columns.push(column.to_string());
            self.values.push(value.to_sql_value());
        }
        self
    }

    /// Writes every column of a nested record in place.
    pub fn flatten<R: SqlRow + ?Sized>(&mut self, nested: &R) -> &mut Self {
        nested.encode(self);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn finish(self) -> (Vec<String>, Vec<SqlValue>) {
        (self.columns, self.values)
    }
}

/// Ordered `(columns, values)` of `row`, skipping `exclude`.
pub fn extract_columns<R: SqlRow + ?Sized, S: AsRef<str>>(
    row: &R,
    exclude: &[S],
) -> (Vec<String>, Vec<SqlValue>) {
    let mut encoder = RowEncoder::excluding(exclude);
    row.encode(&mut encoder);
    encoder.finish()
}

/// Ordered values of `row`.
pub fn row_values<R: SqlRow + ?Sized>(row: &R) -> Vec<SqlValue> {
    extract_columns::<R, &str>(row, &[]).1
}

/// Ordered column names of `row`.
pub fn row_columns<R: SqlRow + ?Sized>(row: &R) -> Vec<String> {
    extract_columns::<R, &str>(row, &[]).0
}

/// Implements [`SqlRow`] from a field-to-column table.
///
/// Each entry is one of:
/// - `field => "column"`: write the field under that column,
/// - `field => _`: never written,
/// - `field => flatten`: the field is itself a [`SqlRow`] written in place.
///
/// ```ignore
/// sql_row!(Product {
///     id => "id",
///     name => "name",
///     cache => _,
///     audit => flatten,
/// });
/// ```
#[macro_export]
macro_rules! sql_row {
    (@field $self:ident, $out:ident, $field:ident, _) => {};
    (@field $self:ident, $out:ident, $field:ident, flatten) => {
        $out.flatten(&$self.$field);
    };
    (@field $self:ident, $out:ident, $field:ident, $col:literal) => {
        $out.field($col, &$self.$field);
    };
    ($ty:ty { $($field:ident => $col:tt),* $(,)? }) => {
        impl $crate::row::SqlRow for $ty {
            fn encode(&self, out: &mut $crate::row::RowEncoder) {
                $( $crate::sql_row!(@field self, out, $field, $col); )*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parse_db_array;
    use chrono::{DateTime, TimeZone, Utc};

    struct Audit {
        created_by: String,
        created_at: DateTime<Utc>,
    }

    struct Product {
        id: i64,
        name: String,
        price: Option<f64>,
        scratch: u32,
        audit: Audit,
    }

    crate::sql_row!(Audit {
        created_by => "created_by",
        created_at => "created_at",
    });

    crate::sql_row!(Product {
        id => "id",
        name => "name",
        price => "price",
        scratch => _,
        audit => flatten,
    });

    fn product() -> Product {
        Product {
            id: 1,
            name: "pen".into(),
            price: None,
            scratch: 9,
            audit: Audit {
                created_by: "ops".into(),
                created_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            },
        }
    }

    #[test]
    fn test_extract_flattens_and_skips_ignored() {
        let p = product();
        let (cols, vals) = extract_columns::<_, &str>(&p, &[]);
        assert_eq!(cols, vec!["id", "name", "price", "created_by", "created_at"]);
        assert_eq!(cols.len(), vals.len());
        assert_eq!(vals[0], SqlValue::Int(1));
        assert_eq!(vals[2], SqlValue::Null(crate::sql::SqlKind::Float));
        assert_eq!(
            vals[4],
            SqlValue::Timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(p.scratch, 9);
    }

    #[test]
    fn test_exclusion_applies_to_nested_records() {
        let (cols, vals) = extract_columns(&product(), &["name", "created_by"]);
        assert_eq!(cols, vec!["id", "price", "created_at"]);
        assert_eq!(vals.len(), 3);
    }

    #[test]
    fn test_column_order_is_stable() {
        let mut other = product();
        other.id = 42;
        other.price = Some(2.5);
        assert_eq!(row_columns(&product()), row_columns(&other));
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Reading {
        id: i64,
        label: String,
        value: Option<f64>,
        note: Option<String>,
        tags: Vec<String>,
        seen: Vec<DateTime<Utc>>,
        meta: serde_json::Value,
    }

    crate::sql_row!(Reading {
        id => "id",
        label => "label",
        value => "value",
        note => "note",
        tags => "tags",
        seen => "seen",
        meta => "meta",
    });

    /// Rebuilds a reading from encoded columns, reading arrays back through
    /// their PostgreSQL text form.
    fn decode_reading(cols: &[String], vals: &[SqlValue]) -> Reading {
        let get = |name: &str| {
            let idx = cols.iter().position(|c| c == name).unwrap();
            vals[idx].clone()
        };
        let array_text = |v: SqlValue| match v {
            SqlValue::Array(a) => a.to_pg_text(),
            other => panic!("not an array: {other}"),
        };
        Reading {
            id: match get("id") {
                SqlValue::Int(v) => v,
                other => panic!("id: {other}"),
            },
            label: match get("label") {
                SqlValue::Text(v) => v,
                other => panic!("label: {other}"),
            },
            value: match get("value") {
                SqlValue::Float(v) => Some(v),
                SqlValue::Null(crate::sql::SqlKind::Float) => None,
                other => panic!("value: {other}"),
            },
            note: match get("note") {
                SqlValue::Text(v) => Some(v),
                SqlValue::Null(crate::sql::SqlKind::Text) => None,
                other => panic!("note: {other}"),
            },
            tags: parse_db_array(&array_text(get("tags"))).unwrap(),
            seen: parse_db_array(&array_text(get("seen"))).unwrap(),
            meta: match get("meta") {
                SqlValue::Json(v) => v,
                other => panic!("meta: {other}"),
            },
        }
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let reading = Reading {
            id: 7,
            label: "o'clock".into(),
            value: Some(1.25),
            note: None,
            tags: vec!["north".into(), "roof".into()],
            seen: vec![
                Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap(),
            ],
            meta: serde_json::json!({"unit": "c", "scale": 2}),
        };

        let (cols, vals) = extract_columns::<_, &str>(&reading, &[]);
        assert_eq!(decode_reading(&cols, &vals), reading);

        let empty = Reading {
            value: None,
            note: Some(String::new()),
            tags: Vec::new(),
            seen: Vec::new(),
            ..reading
        };
        let (cols, vals) = extract_columns::<_, &str>(&empty, &[]);
        assert_eq!(decode_reading(&cols, &vals), empty);
    }
}
