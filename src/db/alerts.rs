//! Saved-search alerts and their matches. Grounded in
//! `examples/original_source/db/database.py`'s alert methods.

use crate::db::connection::Store;
use crate::errors::StoreError;
use crate::scraper::AlertCriteria;
use rusqlite::{params, Row};

impl Store {
    pub fn get_active_alerts(&self) -> Result<Vec<AlertCriteria>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, min_price, max_price, min_surface, max_surface,
                    department_codes, regions, property_types, tribunal_slugs, is_active
             FROM alerts WHERE is_active = 1",
        )?;
        let rows = stmt
            .query_map([], row_to_alert)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_alert(&self, criteria: &AlertCriteria) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO alerts (
                name, min_price, max_price, department_codes, regions,
                property_types, min_surface, max_surface, tribunal_slugs
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                criteria.name,
                criteria.min_price,
                criteria.max_price,
                criteria.department_codes,
                criteria.regions,
                criteria.property_types,
                criteria.min_surface,
                criteria.max_surface,
                criteria.tribunal_slugs,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn delete_alert(&self, alert_id: i64) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM alerts WHERE id = ?1", [alert_id])?;
        Ok(())
    }

    pub fn toggle_alert(&self, alert_id: i64) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE alerts SET is_active = 1 - is_active, updated_at = datetime('now') WHERE id = ?1",
            [alert_id],
        )?;
        Ok(())
    }

    pub fn insert_alert_match(&self, alert_id: i64, listing_id: i64) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO alert_matches (alert_id, listing_id) VALUES (?1, ?2)",
            params![alert_id, listing_id],
        )?;
        Ok(())
    }

    pub fn get_unread_matches(&self) -> Result<Vec<UnreadMatch>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT am.id, a.name, l.licitor_id, l.city, l.property_type,
                    l.starting_price, l.auction_date, l.url_path
             FROM alert_matches am
             JOIN alerts a ON a.id = am.alert_id
             JOIN listings l ON l.id = am.listing_id
             WHERE am.is_seen = 0
             ORDER BY am.matched_at DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(UnreadMatch {
                    match_id: row.get(0)?,
                    alert_name: row.get(1)?,
                    licitor_id: row.get(2)?,
                    city: row.get(3)?,
                    property_type: row.get(4)?,
                    starting_price: row.get(5)?,
                    auction_date: row.get(6)?,
                    url_path: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn mark_matches_seen(&self, match_ids: &[i64]) -> Result<(), StoreError> {
        if match_ids.is_empty() {
            return Ok(());
        }
        let conn = self.connect()?;
        let placeholders = vec!["?"; match_ids.len()].join(",");
        let sql = format!("UPDATE alert_matches SET is_seen = 1 WHERE id IN ({placeholders})");
        let params: Vec<&dyn rusqlite::ToSql> =
            match_ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
        conn.execute(&sql, params.as_slice())?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnreadMatch {
    pub match_id: i64,
    pub alert_name: String,
    pub licitor_id: i64,
    pub city: Option<String>,
    pub property_type: Option<String>,
    pub starting_price: Option<i64>,
    pub auction_date: Option<String>,
    pub url_path: String,
}

fn row_to_alert(row: &Row) -> rusqlite::Result<AlertCriteria> {
    Ok(AlertCriteria {
        id: row.get(0)?,
        name: row.get(1)?,
        min_price: row.get(2)?,
        max_price: row.get(3)?,
        min_surface: row.get(4)?,
        max_surface: row.get(5)?,
        department_codes: row.get(6)?,
        regions: row.get(7)?,
        property_types: row.get(8)?,
        tribunal_slugs: row.get(9)?,
        is_active: row.get::<_, i64>(10)? != 0,
    })
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
    fn create_then_list_active_alerts() {
        let (_dir, store) = test_store();
        let id = store
            .create_alert(&AlertCriteria {
                id: 0,
                name: "Paris apartments".to_string(),
                min_price: Some(50_000),
                max_price: Some(300_000),
                ..Default::default()
            })
            .unwrap();
        assert!(id > 0);
        let active = store.get_active_alerts().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Paris apartments");
    }

    #[test]
    fn toggle_alert_flips_is_active() {
        let (_dir, store) = test_store();
        let id = store
            .create_alert(&AlertCriteria {
                name: "x".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(store.get_active_alerts().unwrap().len(), 1);
        store.toggle_alert(id).unwrap();
        assert_eq!(store.get_active_alerts().unwrap().len(), 0);
    }

    #[test]
    fn insert_alert_match_is_idempotent() {
        let (_dir, store) = test_store();
        store
            .upsert_listing_summary(
                &crate::scraper::ListingSummary {
                    licitor_id: 1,
                    url_path: "/annonce/x/1.html".to_string(),
                    ..Default::default()
                },
                None,
                false,
                None,
            )
            .unwrap();
        let listing = store.get_listing_by_licitor_id(1).unwrap().unwrap();
        let alert_id = store
            .create_alert(&AlertCriteria {
                name: "x".to_string(),
                ..Default::default()
            })
            .unwrap();

        store.insert_alert_match(alert_id, listing.id).unwrap();
        store.insert_alert_match(alert_id, listing.id).unwrap();

        let matches = store.get_unread_matches().unwrap();
        assert_eq!(matches.len(), 1);

        store.mark_matches_seen(&[matches[0].match_id]).unwrap();
        assert!(store.get_unread_matches().unwrap().is_empty());
    }
}
