//! The store owns a path, not a connection: every operation opens a fresh
//! `rusqlite::Connection` for its own duration rather than holding one open
//! across calls (spec.md §4.4's concurrency discipline — the worker thread
//! and a concurrently-running CLI report command must not contend over one
//! shared handle).

use crate::errors::StoreError;
use rusqlite::Connection;
use std::path::Path;

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Clone)]
pub struct Store {
    path: String,
}

impl Store {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Open a new connection with the pragmas the whole crate relies on.
    pub(crate) fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Create the schema (idempotent) and run additive migrations. Safe to
    /// call on every startup.
    pub fn initialize(&self) -> Result<(), StoreError> {
        if let Some(parent) = Path::new(&self.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::DbError(format!("cannot create {}: {e}", parent.display())))?;
            }
        }

        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)?;
        self.migrate(&conn)?;
        Ok(())
    }

    /// Additive schema changes for databases created before a given column
    /// or constraint existed. Grounded in `_migrate()`'s two-step approach:
    /// try an `ALTER TABLE ADD COLUMN` and swallow the duplicate-column
    /// error; probe the `scrape_log` CHECK constraint with a disposable
    /// insert and rebuild-and-swap the table if it's rejected.
    fn migrate(&self, conn: &Connection) -> Result<(), StoreError> {
        let column_migrations = [
            "ALTER TABLE listings ADD COLUMN result_status TEXT",
            "ALTER TABLE listings ADD COLUMN final_price INTEGER",
            "ALTER TABLE listings ADD COLUMN result_date TEXT",
            "ALTER TABLE tribunals ADD COLUMN listing_count INTEGER NOT NULL DEFAULT 0",
        ];
        for sql in column_migrations {
            if let Err(e) = conn.execute(sql, []) {
                if !is_duplicate_column(&e) {
                    return Err(e.into());
                }
            }
        }

        let probe = conn.execute(
            "INSERT INTO scrape_log (scrape_type) VALUES ('surface_backfill')",
            [],
        );
        match probe {
            Ok(_) => {
                conn.execute(
                    "DELETE FROM scrape_log WHERE scrape_type = 'surface_backfill' \
                     AND finished_at IS NULL AND pages_scraped = 0",
                    [],
                )?;
            }
            Err(_) => {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS scrape_log_new (
                        id               INTEGER PRIMARY KEY AUTOINCREMENT,
                        started_at       TEXT DEFAULT (datetime('now')),
                        finished_at      TEXT,
                        scrape_type      TEXT NOT NULL CHECK(scrape_type IN (
                            'full_index', 'incremental', 'history',
                            'detail_backfill', 'map_backfill', 'surface_backfill'
                        )),
                        pages_scraped    INTEGER DEFAULT 0,
                        listings_new     INTEGER DEFAULT 0,
                        listings_updated INTEGER DEFAULT 0,
                        errors           INTEGER DEFAULT 0,
                        notes            TEXT
                    );
                    INSERT INTO scrape_log_new SELECT * FROM scrape_log;
                    DROP TABLE scrape_log;
                    ALTER TABLE scrape_log_new RENAME TO scrape_log;",
                )?;
            }
        }

        Ok(())
    }
}

fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    err.to_string().to_lowercase().contains("duplicate column")
}
