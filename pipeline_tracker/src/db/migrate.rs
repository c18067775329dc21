//! Embedded schema migrations.

use diesel::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use crate::{
    db::connection::connect_sqlite,
    error::{Result, TrackerError},
};

/// Embedded Diesel migrations bundled with this crate.
///
/// These are applied by [`run_sqlite`] to bring the database schema up to date.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies pending migrations on an open connection, returning how many ran.
pub fn run_pending(conn: &mut SqliteConnection) -> Result<usize> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| TrackerError::store_query("migrate", e))?;
    for version in &applied {
        info!(%version, "applied migration");
    }
    Ok(applied.len())
}

/// Opens the SQLite database at `url` (WAL, foreign keys, busy timeout) and
/// applies every pending migration.
pub fn run_sqlite(url: &str) -> Result<usize> {
    let mut conn = connect_sqlite(url)?;
    run_pending(&mut conn)
}
