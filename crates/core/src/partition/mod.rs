//! Range partition management for tables keyed by an auto-incrementing id.
//!
//! The parent table `schema.name` is expected to be declared
//! `PARTITION BY RANGE (id)` with its sequence named `schema.name_id_seq`.
//! Partitions are named `<partition_schema>.<name>_<bucket>` and cover
//! `[bucket * modulus, (bucket + 1) * modulus)`.

use log::{debug, error};

use crate::errors::{Error, Result};
use crate::runner::SqlRunner;
use crate::sql::{create_range_partition_sql, SqlValue};

/// One numeric range partition of a parent table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDescriptor {
    pub parent_table: String,
    pub partition_schema: String,
    pub modulus: i64,
    pub bucket: i64,
    pub range_start: i64,
    pub range_end: i64,
}

impl PartitionDescriptor {
    /// The partition owning `value`.
    pub fn for_value(
        parent_table: &str,
        partition_schema: &str,
        modulus: i64,
        value: i64,
    ) -> Result<Self> {
        if modulus <= 0 {
            return Err(Error::InvalidModulus(modulus));
        }
        short_table_name(parent_table)?;
        let bucket = value.div_euclid(modulus);
        Self::for_bucket(parent_table, partition_schema, modulus, bucket)
    }

    fn for_bucket(
        parent_table: &str,
        partition_schema: &str,
        modulus: i64,
        bucket: i64,
    ) -> Result<Self> {
        let bounds = bucket.checked_mul(modulus).and_then(|start| {
            bucket
                .checked_add(1)
                .and_then(|b| b.checked_mul(modulus))
                .map(|end| (start, end))
        });
        let Some((range_start, range_end)) = bounds else {
            return Err(Error::PartitionSetup(format!(
                "bucket {bucket} of {parent_table} with modulus {modulus} is out of the bigint range"
            )));
        };
        Ok(Self {
            parent_table: parent_table.to_string(),
            partition_schema: partition_schema.to_string(),
            modulus,
            bucket,
            range_start,
            range_end,
        })
    }

    /// The partition directly after this one. Fails when its range does not
    /// fit in a bigint.
    pub fn next(&self) -> Result<Self> {
        let bucket = self.bucket.checked_add(1).ok_or_else(|| {
            Error::PartitionSetup(format!("no partition after bucket {}", self.bucket))
        })?;
        Self::for_bucket(&self.parent_table, &self.partition_schema, self.modulus, bucket)
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.range_start..self.range_end).contains(&value)
    }

    /// Fully qualified partition table name.
    pub fn name(&self) -> String {
        let short = self
            .parent_table
            .split_once('.')
            .map(|(_, t)| t)
            .unwrap_or(&self.parent_table);
        format!("{}.{}_{}", self.partition_schema, short, self.bucket)
    }

    /// Idempotent DDL creating this partition.
    pub fn create_sql(&self) -> String {
        create_range_partition_sql(
            &self.name(),
            &self.parent_table,
            &SqlValue::Int(self.range_start),
            &SqlValue::Int(self.range_end),
        )
    }
}

fn short_table_name(table: &str) -> Result<&str> {
    match table.split_once('.') {
        Some((schema, short)) if !schema.is_empty() && !short.is_empty() => Ok(short),
        _ => Err(Error::InvalidTableName(table.to_string())),
    }
}

/// Query reading the last value handed out by the table's id sequence.
pub fn last_value_query(table: &str) -> String {
    format!("SELECT last_value FROM {table}_id_seq LIMIT 1")
}

/// Makes sure the partition holding the current sequence value and the one
/// after it exist, creating them with `CREATE TABLE IF NOT EXISTS` in a
/// single batch.
///
/// A sequence that yields no value is treated as bucket 0. There is no
/// locking: concurrent callers may both issue the DDL, which the
/// `IF NOT EXISTS` form tolerates. Nothing is retried.
pub fn prepare_id_partition<R: SqlRunner + ?Sized>(
    runner: &mut R,
    table: &str,
    partition_schema: &str,
    modulus: i64,
) -> Result<[PartitionDescriptor; 2]> {
    if modulus <= 0 {
        return Err(Error::InvalidModulus(modulus));
    }
    short_table_name(table)?;

    let last_value = runner
        .query_scalar(&last_value_query(table), &[])
        .map_err(|e| {
            error!("error read id sequence of {}: {}", table, e);
            Error::PartitionSetup(format!("read sequence of {table}: {e}"))
        })?
        .unwrap_or(0);

    let current = PartitionDescriptor::for_value(table, partition_schema, modulus, last_value)
        .and_then(|current| current.next().map(|next| (current, next)))
        .inspect_err(|e| error!("error compute partitions of {}: {}", table, e));
    let (current, next) = current?;

    let ddl = format!("{};{}", current.create_sql(), next.create_sql());
    runner.batch_execute(&ddl).map_err(|e| {
        error!("error create partitions of {}: {}", table, e);
        Error::PartitionSetup(format!("create partitions of {table}: {e}"))
    })?;
    debug!(
        "Partitions {} and {} ready for {} (last value {})",
        current.name(),
        next.name(),
        table,
        last_value
    );
    Ok([current, next])
}

/// Partition settings for one schema, usable as a create hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPartitioner {
    pub partition_schema: String,
    pub modulus: i64,
}

impl IdPartitioner {
    pub fn new(partition_schema: impl Into<String>, modulus: i64) -> Self {
        Self {
            partition_schema: partition_schema.into(),
            modulus,
        }
    }

    pub fn prepare<R: SqlRunner + ?Sized>(&self, runner: &mut R, table: &str) -> Result<()> {
        prepare_id_partition(runner, table, &self.partition_schema, self.modulus).map(|_| ())
    }
}
