//! [`SqlRunner`] over a Diesel PostgreSQL connection.

use diesel::connection::SimpleConnection;
use diesel::deserialize::QueryableByName;
use diesel::pg::{Pg, PgConnection};
use diesel::sql_types::{BigInt, Nullable};
use diesel::RunQueryDsl;
use log::debug;

use dbkit_core::runner::{RowLoader, SqlRunner};
use dbkit_core::{Result, SqlValue};

use crate::bind::bind_all;
use crate::errors::IntoCore;

#[derive(diesel::QueryableByName)]
struct ScalarRow {
    #[diesel(sql_type = Nullable<BigInt>)]
    scalar: Option<i64>,
}

#[derive(diesel::QueryableByName)]
struct IdRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
}

/// Runs dbkit statements on a borrowed connection. A connection handed out
/// by `Connection::transaction` works the same way, which makes a whole
/// helper call atomic.
pub struct PgRunner<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> PgRunner<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }

    pub fn connection(&mut self) -> &mut PgConnection {
        self.conn
    }
}

impl SqlRunner for PgRunner<'_> {
    fn execute(&mut self, sql: &str, args: &[SqlValue]) -> Result<usize> {
        debug!("execute with {} args: {:.200}", args.len(), sql);
        bind_all(sql, args).execute(self.conn).into_core()
    }

    fn batch_execute(&mut self, sql: &str) -> Result<()> {
        self.conn.batch_execute(sql).into_core()
    }

    fn query_scalar(&mut self, sql: &str, args: &[SqlValue]) -> Result<Option<i64>> {
        let wrapped = format!("SELECT (({sql}))::BIGINT AS scalar");
        let rows: Vec<ScalarRow> = bind_all(&wrapped, args).load(self.conn).into_core()?;
        Ok(rows.into_iter().next().and_then(|row| row.scalar))
    }

    fn query_ids(&mut self, sql: &str, args: &[SqlValue]) -> Result<Vec<i64>> {
        let rows: Vec<IdRow> = bind_all(sql, args).load(self.conn).into_core()?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }
}

impl<T> RowLoader<T> for PgRunner<'_>
where
    T: QueryableByName<Pg> + 'static,
{
    fn load(&mut self, sql: &str, args: &[SqlValue]) -> Result<Vec<T>> {
        bind_all(sql, args).load::<T>(self.conn).into_core()
    }
}
