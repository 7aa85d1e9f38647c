//! Tribunal upserts. Grounded in
//! `examples/original_source/db/database.py`'s `upsert_tribunals`/
//! `get_tribunal_id`.

use crate::db::connection::Store;
use crate::errors::StoreError;
use crate::scraper::TribunalInfo;
use rusqlite::Connection;

impl Store {
    pub fn upsert_tribunals(&self, tribunals: &[TribunalInfo]) -> Result<(), StoreError> {
        let conn = self.connect()?;
        for t in tribunals {
            conn.execute(
                "INSERT INTO tribunals (name, slug, region, listing_count) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(slug) DO UPDATE SET
                    name = excluded.name, region = excluded.region,
                    listing_count = excluded.listing_count",
                (&t.name, &t.slug, &t.region, t.listing_count),
            )?;
        }
        Ok(())
    }

    pub fn get_tribunal_id(&self, slug: &str) -> Result<Option<i64>, StoreError> {
        let conn = self.connect()?;
        tribunal_id(&conn, slug)
    }
}

/// Shared with `listings.rs`, which needs the id within the same
/// connection as the listing insert it's resolving for.
pub(crate) fn tribunal_id(conn: &Connection, slug: &str) -> Result<Option<i64>, StoreError> {
    let mut stmt = conn.prepare("SELECT id FROM tribunals WHERE slug = ?1")?;
    let mut rows = stmt.query([slug])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let store = Store::new(path.to_string_lossy().to_string());
        store.initialize().unwrap();
        (dir, store)
    }

    #[test]
    fn upsert_then_update_preserves_slug_uniqueness() {
        let (_dir, store) = test_store();
        let t = TribunalInfo {
            slug: "tj-paris".to_string(),
            name: "Paris".to_string(),
            region: Some("Île-de-France".to_string()),
            url_path: "/x".to_string(),
            listing_count: 10,
        };
        store.upsert_tribunals(&[t.clone()]).unwrap();
        let id_first = store.get_tribunal_id("tj-paris").unwrap().unwrap();

        let mut updated = t;
        updated.name = "Tribunal de Paris".to_string();
        store.upsert_tribunals(&[updated]).unwrap();
        let id_second = store.get_tribunal_id("tj-paris").unwrap().unwrap();

        assert_eq!(id_first, id_second);
    }

    #[test]
    fn unknown_slug_returns_none() {
        let (_dir, store) = test_store();
        assert_eq!(store.get_tribunal_id("tj-nowhere").unwrap(), None);
    }
}
