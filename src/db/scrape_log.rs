//! Scrape-run bookkeeping: one row per workflow invocation, opened at the
//! start and finalized on every exit path (success, cancellation, or
//! error — spec.md §4.6). Grounded in
//! `examples/original_source/db/database.py`'s `start_scrape_log`/
//! `finish_scrape_log`.

use crate::db::connection::Store;
use crate::errors::StoreError;
use rusqlite::params;

impl Store {
    pub fn start_scrape_log(&self, scrape_type: &str) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO scrape_log (scrape_type) VALUES (?1)",
            [scrape_type],
        )?;
        Ok(conn.last_insert_rowid())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn finish_scrape_log(
        &self,
        log_id: i64,
        pages_scraped: i64,
        listings_new: i64,
        listings_updated: i64,
        errors: i64,
        notes: &str,
    ) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE scrape_log SET
                finished_at = datetime('now'),
                pages_scraped = ?1, listings_new = ?2,
                listings_updated = ?3, errors = ?4, notes = ?5
             WHERE id = ?6",
            params![pages_scraped, listings_new, listings_updated, errors, notes, log_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::Store;

    fn test_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let store = Store::new(path.to_string_lossy().to_string());
        store.initialize().unwrap();
        (dir, store)
    }

    #[test]
    fn start_then_finish_round_trips() {
        let (_dir, store) = test_store();
        let id = store.start_scrape_log("incremental").unwrap();
        assert!(id > 0);
        store
            .finish_scrape_log(id, 3, 5, 2, 0, "ok")
            .unwrap();

        let conn = store.connect().unwrap();
        let finished_at: Option<String> = conn
            .query_row("SELECT finished_at FROM scrape_log WHERE id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert!(finished_at.is_some());
    }

    #[test]
    fn rejects_unknown_scrape_type() {
        let (_dir, store) = test_store();
        assert!(store.start_scrape_log("not-a-real-type").is_err());
    }
}
