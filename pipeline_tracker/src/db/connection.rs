//! SQLite connection helpers.
//!
//! Provides [`connect_sqlite`] that opens a connection and applies the PRAGMAs the
//! tracker relies on: WAL journaling, foreign_keys=ON, and a 5000ms busy_timeout.
//!
//! Example:
//! ```no_run
//! use pipeline_tracker::db::connection::connect_sqlite;
//!
//! let path = std::env::temp_dir().join("pipeline_tracker_example.db");
//! let _conn = connect_sqlite(path.to_str().unwrap()).expect("open sqlite");
//! ```

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

use crate::error::{Result, TrackerError};

/// Strips an optional `sqlite://` or `sqlite:` scheme so plain paths and URLs both work.
pub fn sqlite_path(database_url: &str) -> &str {
    let url = database_url.trim();
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}

/// Open a SQLite connection and apply connection-wide PRAGMAs.
///
/// Any failure here is `STORE_CONNECTION_ERROR`.
pub fn connect_sqlite(database_url: &str) -> Result<SqliteConnection> {
    let path = sqlite_path(database_url);
    let mut conn = SqliteConnection::establish(path)
        .map_err(|e| TrackerError::StoreConnection(format!("{path}: {e}")))?;

    // Readers never block the single writer; writers wait instead of failing fast.
    for pragma in [
        "PRAGMA journal_mode=WAL;",
        "PRAGMA foreign_keys=ON;",
        "PRAGMA busy_timeout=5000;",
    ] {
        sql_query(pragma)
            .execute(&mut conn)
            .map_err(|e| TrackerError::StoreConnection(format!("{path}: {pragma} {e}")))?;
    }
    Ok(conn)
}
