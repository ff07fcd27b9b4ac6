//! Connection pooling, database provisioning and migrations.

use std::path::Path;
use std::sync::Arc;

use diesel::connection::{Connection, SimpleConnection};
use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager, Pool, PooledConnection};
use diesel_migrations::{FileBasedMigrations, MigrationHarness};
use log::{error, info};

use dbkit_core::config::random_database_name;
use dbkit_core::errors::{DatabaseError, Error, Result};
use dbkit_core::runner::SqlRunner;
use dbkit_core::{DbConfig, SqlValue};

use crate::errors::{IntoCore, StorageError};
use crate::runner::PgRunner;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Maintenance database every server has; new databases are created from it.
const BASE_DATABASE: &str = "postgres";

/// Builds the connection pool. Zero settings in `cfg` take their defaults.
pub fn create_pool(url: &str, cfg: &DbConfig) -> Result<Arc<DbPool>> {
    let cfg = cfg.with_defaults();
    let manager = ConnectionManager::<PgConnection>::new(url);
    let pool = Pool::builder()
        .max_size(cfg.max_open_conn)
        .min_idle(Some(cfg.max_idle_conn.min(cfg.max_open_conn)))
        .idle_timeout(Some(cfg.conn_max_idle_time))
        .max_lifetime(Some(cfg.conn_max_lifetime))
        .connection_customizer(Box::new(ConnectionCustomizer))
        .build(manager)
        .into_core()
        .inspect_err(|e| error!("cannot get postgres connection: {}", e))?;
    info!(
        "Postgres pool ready (max {} connections, {} idle)",
        cfg.max_open_conn, cfg.max_idle_conn
    );
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    pool.get().into_core()
}

/// Opens a pool on `db_name` and pins the database timezone to UTC.
pub fn new_db(db_name: &str, url: &str, cfg: &DbConfig) -> Result<Arc<DbPool>> {
    check_identifier(db_name)?;
    let pool = create_pool(url, cfg)?;
    let mut conn = get_connection(&pool)?;
    conn.batch_execute(&format!("ALTER DATABASE {db_name} SET timezone TO 'UTC'"))
        .into_core()
        .inspect_err(|e| error!("Error in setting timezone: {}", e))?;
    Ok(pool)
}

/// Creates `new_db` on the server reachable through `base_url` when it does
/// not exist yet, then applies the migrations found in `migrations_dir`.
/// Migrations only run for a freshly created database.
pub fn setup_local_storage(
    new_db: &str,
    base_db: &str,
    base_url: &str,
    migrations_dir: Option<&Path>,
) -> Result<()> {
    check_identifier(new_db)?;
    let migrate = migrations_dir
        .map(|dir| with_database(base_url, base_db, new_db).map(|url| (dir, url)))
        .transpose()?;
    let mut base = PgConnection::establish(base_url)
        .into_core()
        .inspect_err(|e| error!("error get base database connection: {}", e))?;

    let exists = PgRunner::new(&mut base)
        .query_scalar(
            "SELECT COUNT(*) FROM pg_database WHERE datname = $1",
            &[SqlValue::Text(new_db.to_string())],
        )?
        .unwrap_or(0)
        > 0;
    if exists {
        return Ok(());
    }

    info!("Creating database {}", new_db);
    base.batch_execute(&format!("CREATE DATABASE {new_db}"))
        .into_core()
        .inspect_err(|e| error!("error create local database: {}", e))?;
    drop(base);

    if let Some((dir, url)) = migrate {
        let mut conn = PgConnection::establish(&url).into_core()?;
        run_migrations(&mut conn, dir)?;
    }
    Ok(())
}

/// Provisions a randomly named database next to `base_url`'s and returns its
/// name with a pool on it.
pub fn new_test_db(base_url: &str, migrations_dir: Option<&Path>) -> Result<(String, Arc<DbPool>)> {
    let db_name = random_database_name();
    let url = with_database(base_url, BASE_DATABASE, &db_name)?;
    setup_local_storage(&db_name, BASE_DATABASE, base_url, migrations_dir)?;
    info!("---- {}", db_name);
    let pool = new_db(&db_name, &url, &DbConfig::default())?;
    Ok((db_name, pool))
}

/// Runs pending Diesel migrations (`<version>_<name>/up.sql` directories).
pub fn run_migrations(conn: &mut PgConnection, dir: &Path) -> Result<()> {
    info!("Running database migrations from {}", dir.display());
    let migrations = FileBasedMigrations::from_path(dir)
        .map_err(|e| StorageError::MigrationFailed(e.to_string()))
        .into_core()?;

    let applied = conn
        .run_pending_migrations(migrations)
        .map_err(|e| StorageError::MigrationFailed(e.to_string()))
        .into_core()
        .inspect_err(|e| error!("Database migration failed: {}", e))?;

    if applied.is_empty() {
        info!("No pending migrations to apply.");
    } else {
        info!("Applied the following migrations:");
        for version in &applied {
            info!("  - {}", version);
        }
    }
    Ok(())
}

/// Rewrites the database of a connection string, either libpq key/value
/// (`dbname=...`) or URL form (`postgres://host/db?...`). Fails when
/// `from_db` is not the database named by `url`.
pub fn with_database(url: &str, from_db: &str, to_db: &str) -> Result<String> {
    let rewritten = if url.contains("://") {
        let (head, query) = match url.split_once('?') {
            Some((head, query)) => (head, Some(query)),
            None => (url, None),
        };
        match head.rsplit_once('/') {
            Some((prefix, db)) if db == from_db => Some(match query {
                Some(query) => format!("{prefix}/{to_db}?{query}"),
                None => format!("{prefix}/{to_db}"),
            }),
            _ => None,
        }
    } else {
        let from = format!("dbname={from_db}");
        let mut replaced = false;
        let tokens: Vec<String> = url
            .split_whitespace()
            .map(|token| {
                if token == from {
                    replaced = true;
                    format!("dbname={to_db}")
                } else {
                    token.to_string()
                }
            })
            .collect();
        replaced.then(|| tokens.join(" "))
    };

    rewritten.ok_or_else(|| {
        error!("connection string does not name database {}", from_db);
        Error::Database(DatabaseError::ConnectionFailed(format!(
            "connection string does not name database {from_db}"
        )))
    })
}

fn check_identifier(name: &str) -> Result<()> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Database(DatabaseError::Internal(format!(
            "invalid database name: {name}"
        ))))
    }
}

#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<PgConnection, r2d2::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute("SET TIMEZONE TO 'UTC'")
            .map_err(r2d2::Error::QueryError)
    }
}

/// Executes operations within a transaction on a pooled connection.
pub trait DbTransactionExecutor {
    fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgRunner<'_>) -> Result<T>;
}

impl DbTransactionExecutor for DbPool {
    fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgRunner<'_>) -> Result<T>,
    {
        let mut conn = get_connection(self)?;
        conn.transaction::<T, StorageError, _>(|tx| {
            f(&mut PgRunner::new(tx)).map_err(StorageError::from)
        })
        .into_core()
    }
}

impl DbTransactionExecutor for Arc<DbPool> {
    fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgRunner<'_>) -> Result<T>,
    {
        (**self).transaction(f)
    }
}
