// Database layer: SQLite storage for analysis runs.
//
// rusqlite with the "bundled" feature, so there's no system SQLite
// dependency. The database file lives wherever NEWSPRISM_DB_PATH points
// (defaults to ./newsprism.db). Each `analyze` run is stored whole under a
// new run id; nothing is updated in place.

pub mod models;
pub mod queries;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open (or create) the database and run migrations.
///
/// Called by `newsprism init` and by `analyze` when results are persisted.
pub fn initialize(db_path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;
    configure(&conn)?;

    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Open an existing database (fails if it doesn't exist yet).
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!(
            "Database not found at {}. Run `newsprism init` first.",
            db_path
        );
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;
    configure(&conn)?;

    Ok(conn)
}

/// Connection settings shared by `initialize` and `open`.
///
/// Run rows own their articles, topics, events and features through
/// `ON DELETE CASCADE`, so pruning a run is only correct when SQLite actually
/// enforces foreign keys on this connection.
fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    let enforced: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
    if enforced != 1 {
        anyhow::bail!(
            "SQLite build does not enforce foreign keys; stored runs cannot be pruned safely"
        );
    }
    Ok(())
}
