// Database schema: table creation and migrations.
//
// A `schema_version` table tracks which migrations have run; each migration
// is a closure that executes SQL statements.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet. Idempotent.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per analyze invocation
        CREATE TABLE IF NOT EXISTS runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            articles INTEGER NOT NULL,
            vocabulary_size INTEGER NOT NULL,
            n_topics INTEGER NOT NULL,
            n_events INTEGER NOT NULL,
            seed INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS articles (
            run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            article_id TEXT NOT NULL,
            source TEXT NOT NULL,
            published_at TEXT NOT NULL,        -- RFC 3339, UTC
            title TEXT NOT NULL,
            category TEXT,
            sentiment TEXT,                    -- Negative / Neutral / Positive
            PRIMARY KEY (run_id, article_id)
        );

        -- Topic and keywords of each article
        CREATE TABLE IF NOT EXISTS topics (
            run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            article_id TEXT NOT NULL,
            topic_id INTEGER NOT NULL,
            topic_label TEXT NOT NULL,
            keywords TEXT NOT NULL,            -- JSON array of strings
            PRIMARY KEY (run_id, article_id)
        );

        -- Event cluster summary
        CREATE TABLE IF NOT EXISTS events (
            run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            event_id INTEGER NOT NULL,
            article_count INTEGER NOT NULL,
            earliest_source TEXT,
            earliest_at TEXT,
            PRIMARY KEY (run_id, event_id)
        );

        -- Per-article feature vector and model outputs
        CREATE TABLE IF NOT EXISTS features (
            run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            article_id TEXT NOT NULL,
            tfidf TEXT NOT NULL,               -- JSON array of floats
            topic_id INTEGER NOT NULL,
            event_id INTEGER NOT NULL,
            PRIMARY KEY (run_id, article_id)
        );
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: keep the full serialized report with the run so `status`
    // can show correlation results without re-running the models.
    run_migration(conn, 2, |c| {
        c.execute_batch("ALTER TABLE runs ADD COLUMN report_json TEXT;")
    })?;

    // Migration v3: lookups by source for the per-site queries.
    run_migration(conn, 3, |c| {
        c.execute_batch("CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(run_id, source);")
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (used for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // schema_version, runs, articles, topics, events, features
        assert_eq!(table_count(&conn).unwrap(), 6i64);
    }

    #[test]
    fn test_migrations_recorded_once() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn test_migration_v2_adds_report_column() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute(
            "INSERT INTO runs (articles, vocabulary_size, n_topics, n_events, seed, report_json)
             VALUES (3, 10, 2, 2, 42, '{}')",
            [],
        )
        .unwrap();
        let json: String = conn
            .query_row("SELECT report_json FROM runs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(json, "{}");
    }
}
