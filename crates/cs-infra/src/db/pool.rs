use std::time::Duration;

use anyhow::{Context, Result};
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use tracing::info;

use crate::db::migrations;

/// Type alias for SQLite connection pool
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Applied to every connection the pool hands out.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions {
    pub busy_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON;",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create the connection pool and bring the schema up to date.
///
/// Call once at startup. A failed migration is rolled back entirely and
/// surfaces here as an error.
pub fn init_db_pool(database_url: &str) -> Result<DbPool> {
    init_db_pool_with(database_url, ConnectionOptions::default())
}

pub fn init_db_pool_with(database_url: &str, options: ConnectionOptions) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);

    let mut builder = DbPool::builder().connection_customizer(Box::new(options));
    // Every connection to ":memory:" is a separate database.
    if database_url == ":memory:" {
        builder = builder.max_size(1);
    }

    let pool = builder
        .build(manager)
        .with_context(|| format!("failed to create database pool for {}", database_url))?;

    run_migrations(&pool)?;

    Ok(pool)
}

fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;

    info!("Running database migrations...");
    let applied = migrations::migrate_to_latest(&mut conn).context("database migration failed")?;
    info!(applied = applied.len(), "Database migrations completed");

    Ok(())
}
