//! Manual adjudication-result overrides. In scope as core persistence even
//! though the data-entry form that calls it is not (SPEC_FULL.md §1).

use crate::db::connection::Store;
use crate::errors::StoreError;
use crate::scraper::AdjudicationResult;
use rusqlite::params;

impl Store {
    pub fn insert_adjudication_result(&self, result: &AdjudicationResult) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR REPLACE INTO adjudication_results (listing_id, final_price, price_source, notes)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                result.listing_id,
                result.final_price,
                result.price_source.as_str(),
                result.notes,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::PriceSource;

    fn test_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let store = Store::new(path.to_string_lossy().to_string());
        store.initialize().unwrap();
        (dir, store)
    }

    #[test]
    fn insert_replaces_existing_override() {
        let (_dir, store) = test_store();
        store
            .upsert_listing_summary(
                &crate::scraper::ListingSummary {
                    licitor_id: 42,
                    url_path: "/annonce/x/42.html".to_string(),
                    ..Default::default()
                },
                None,
                false,
                None,
            )
            .unwrap();
        let listing = store.get_listing_by_licitor_id(42).unwrap().unwrap();

        store
            .insert_adjudication_result(&AdjudicationResult {
                listing_id: listing.id,
                final_price: 200_000,
                price_source: PriceSource::Manual,
                notes: Some("first pass".to_string()),
            })
            .unwrap();
        store
            .insert_adjudication_result(&AdjudicationResult {
                listing_id: listing.id,
                final_price: 210_000,
                price_source: PriceSource::External,
                notes: None,
            })
            .unwrap();

        let conn = store.connect().unwrap();
        let (price, source): (i64, String) = conn
            .query_row(
                "SELECT final_price, price_source FROM adjudication_results WHERE listing_id = ?1",
                [listing.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(price, 210_000);
        assert_eq!(source, "external");
    }
}
