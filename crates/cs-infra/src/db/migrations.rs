//! Schema migrations.
//!
//! The SQL lives under `migrations/` and is embedded at compile time. Diesel
//! records applied versions in `__diesel_schema_migrations`. Pending steps
//! run inside one outer transaction (each step becomes a savepoint), so a
//! failing step leaves both the schema and the applied-version records as
//! they were.

use diesel::migration::MigrationSource;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use thiserror::Error;
use tracing::{debug_span, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

type HarnessError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration failed: {0}")]
    Harness(#[source] HarnessError),

    #[error("schema storage error: {0}")]
    Storage(#[from] diesel::result::Error),
}

/// Apply every pending migration of `source` all-or-nothing.
///
/// Returns the versions applied by this call; empty when already current.
pub fn run_pending_atomically<S>(
    conn: &mut SqliteConnection,
    source: S,
) -> Result<Vec<String>, MigrationError>
where
    S: MigrationSource<Sqlite>,
{
    let span = debug_span!("infra.sqlite.migrate");
    let _enter = span.enter();

    conn.transaction::<_, MigrationError, _>(|conn| {
        let applied = conn
            .run_pending_migrations(source)
            .map_err(MigrationError::Harness)?;
        let applied: Vec<String> = applied.iter().map(ToString::to_string).collect();
        for version in &applied {
            info!(version = %version, "applied migration");
        }
        Ok(applied)
    })
}

pub fn migrate_to_latest(conn: &mut SqliteConnection) -> Result<Vec<String>, MigrationError> {
    run_pending_atomically(conn, MIGRATIONS)
}

/// Versions recorded as applied, oldest first.
pub fn applied_versions(conn: &mut SqliteConnection) -> Result<Vec<String>, MigrationError> {
    let mut versions: Vec<String> = conn
        .applied_migrations()
        .map_err(MigrationError::Harness)?
        .iter()
        .map(ToString::to_string)
        .collect();
    versions.sort();
    Ok(versions)
}

pub fn has_pending(conn: &mut SqliteConnection) -> Result<bool, MigrationError> {
    conn.has_pending_migration(MIGRATIONS)
        .map_err(MigrationError::Harness)
}
