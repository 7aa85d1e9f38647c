//! Listing persistence: summary upsert (merge, not overwrite), detail
//! update, and the backfill selector queries. Grounded in
//! `examples/original_source/db/database.py`'s listing methods.

use crate::db::connection::Store;
use crate::db::tribunals::tribunal_id;
use crate::errors::StoreError;
use crate::scraper::{Listing, ListingDetail, ListingSummary};
use rusqlite::{params, OptionalExtension, Row};

impl Store {
    /// Insert a new listing, or merge result/historical fields into an
    /// existing one. Returns `true` if a new row was inserted. Existing
    /// rows never have `starting_price`, `property_type`, `description`,
    /// etc. clobbered here — only the detail scraper overwrites those
    /// fields (spec.md §4.4's merge rule).
    pub fn upsert_listing_summary(
        &self,
        summary: &ListingSummary,
        tribunal_slug: Option<&str>,
        is_historical: bool,
        auction_date: Option<&str>,
    ) -> Result<bool, StoreError> {
        let conn = self.connect()?;

        let existing_id: Option<i64> = conn
            .query_row(
                "SELECT id FROM listings WHERE licitor_id = ?1",
                [summary.licitor_id],
                |row| row.get(0),
            )
            .optional()?;

        if existing_id.is_some() {
            let mut set_clauses = vec!["last_scraped_at = datetime('now')".to_string()];
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(price) = summary.final_price {
                set_clauses.push(format!("final_price = ?{}", values.len() + 1));
                values.push(Box::new(price));
            }
            if let Some(status) = &summary.result_status {
                set_clauses.push(format!("result_status = ?{}", values.len() + 1));
                values.push(Box::new(status.clone()));
                set_clauses.push("status = 'past'".to_string());
            }
            if let Some(date) = &summary.result_date {
                set_clauses.push(format!("result_date = ?{}", values.len() + 1));
                values.push(Box::new(date.clone()));
            }
            if is_historical {
                set_clauses.push("is_historical = 1".to_string());
            }

            let licitor_id_param_idx = values.len() + 1;
            let sql = format!(
                "UPDATE listings SET {} WHERE licitor_id = ?{licitor_id_param_idx}",
                set_clauses.join(", ")
            );
            let mut params_dyn: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
            params_dyn.push(&summary.licitor_id);
            conn.execute(&sql, params_dyn.as_slice())?;
            return Ok(false);
        }

        let tid = match tribunal_slug {
            Some(slug) => tribunal_id(&conn, slug)?,
            None => None,
        };

        conn.execute(
            "INSERT INTO listings (
                licitor_id, url_path, property_type, department_code, city,
                starting_price, description, publication_date, tribunal_id,
                is_historical, status, auction_date, final_price, result_status, result_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                summary.licitor_id,
                summary.url_path,
                summary.property_type,
                summary.department_code,
                summary.city,
                summary.starting_price,
                summary.description,
                summary.publication_date,
                tid,
                if is_historical { 1 } else { 0 },
                if is_historical { "past" } else { "upcoming" },
                auction_date,
                summary.final_price,
                summary.result_status,
                summary.result_date,
            ],
        )?;
        Ok(true)
    }

    /// Overwrite every field the detail scraper can fill in. Unlike the
    /// summary upsert, this one does clobber — a detail scrape is always
    /// authoritative for the fields it extracts. `starting_price` is the
    /// exception: `COALESCE` keeps whatever the tribunal/history walker
    /// already recorded when the detail page didn't find its own mise à
    /// prix (spec.md §4.4).
    pub fn update_listing_detail(&self, detail: &ListingDetail) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE listings SET
                description = ?1, surface_m2 = ?2, energy_rating = ?3,
                occupancy_status = ?4, full_address = ?5,
                latitude = ?6, longitude = ?7, cadastral_ref = ?8,
                auction_date = ?9, auction_time = ?10,
                starting_price = COALESCE(?11, starting_price),
                case_reference = ?12, has_price_reduction = ?13,
                lawyer_name = ?14, lawyer_phone = ?15,
                visit_date = ?16,
                price_per_m2_min = ?17, price_per_m2_avg = ?18, price_per_m2_max = ?19,
                views = ?20, favorites = ?21,
                publication_date = COALESCE(?22, publication_date),
                property_type = COALESCE(?23, property_type),
                detail_scraped = 1, last_scraped_at = datetime('now')
             WHERE licitor_id = ?24",
            params![
                detail.description,
                detail.surface_m2,
                detail.energy_rating,
                detail.occupancy_status,
                detail.full_address,
                detail.latitude,
                detail.longitude,
                detail.cadastral_ref,
                detail.auction_date,
                detail.auction_time,
                detail.starting_price,
                detail.case_reference,
                detail.has_price_reduction.map(|b| if b { 1 } else { 0 }),
                detail.lawyer_name,
                detail.lawyer_phone,
                detail.visit_date,
                detail.price_per_m2_min,
                detail.price_per_m2_avg,
                detail.price_per_m2_max,
                detail.views,
                detail.favorites,
                detail.publication_date,
                detail.property_type,
                detail.licitor_id,
            ],
        )?;
        Ok(())
    }

    /// Flip any `upcoming` listing whose auction date has passed to `past`.
    /// Returns the number of rows flipped.
    pub fn mark_past_auctions(&self) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let n = conn.execute(
            "UPDATE listings SET status = 'past'
             WHERE status = 'upcoming' AND auction_date IS NOT NULL AND auction_date < date('now')",
            [],
        )?;
        Ok(n)
    }

    pub fn get_listings_without_detail(&self, limit: i64) -> Result<Vec<(i64, String)>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT licitor_id, url_path FROM listings
             WHERE detail_scraped = 0
             ORDER BY auction_date IS NULL, auction_date ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_listing_by_licitor_id(&self, licitor_id: i64) -> Result<Option<Listing>, StoreError> {
        let conn = self.connect()?;
        conn.query_row(LISTING_SELECT, [licitor_id], row_to_listing)
            .optional()
            .map_err(StoreError::from)
    }

    /// Historical listings with a result but no recorded starting price
    /// (candidates for the `map-backfill` workflow).
    pub fn get_listings_without_starting_price(&self, limit: i64) -> Result<Vec<(i64, String)>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT licitor_id, url_path FROM listings
             WHERE result_status IS NOT NULL
               AND (starting_price IS NULL OR starting_price = 0)
             ORDER BY licitor_id DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_listing_starting_price(&self, licitor_id: i64, starting_price: i64) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE listings SET starting_price = ?1 WHERE licitor_id = ?2",
            params![starting_price, licitor_id],
        )?;
        Ok(())
    }

    pub fn get_listings_without_surface(&self, limit: i64) -> Result<Vec<(i64, String)>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT licitor_id, url_path FROM listings
             WHERE result_status IS NOT NULL
               AND (surface_m2 IS NULL OR surface_m2 = 0)
             ORDER BY licitor_id DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_listing_surface(&self, licitor_id: i64, surface_m2: f64) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE listings SET surface_m2 = ?1 WHERE licitor_id = ?2",
            params![surface_m2, licitor_id],
        )?;
        Ok(())
    }
}

const LISTING_SELECT: &str = "SELECT
    l.id, l.licitor_id, l.url_path, t.slug, t.region,
    l.property_type, l.department_code, l.city, l.description, l.surface_m2,
    l.starting_price, l.auction_date, l.auction_time, l.full_address,
    l.latitude, l.longitude, l.cadastral_ref, l.lawyer_name, l.lawyer_phone,
    l.case_reference, l.views, l.favorites,
    l.price_per_m2_min, l.price_per_m2_avg, l.price_per_m2_max,
    l.status, l.is_historical, l.detail_scraped,
    l.result_status, l.final_price, l.result_date, l.last_scraped_at
 FROM listings l LEFT JOIN tribunals t ON t.id = l.tribunal_id
 WHERE l.licitor_id = ?1";

fn row_to_listing(row: &Row) -> rusqlite::Result<Listing> {
    Ok(Listing {
        id: row.get(0)?,
        licitor_id: row.get(1)?,
        url_path: row.get(2)?,
        tribunal_slug: row.get(3)?,
        region: row.get(4)?,
        property_type: row.get(5)?,
        department_code: row.get(6)?,
        city: row.get(7)?,
        description: row.get(8)?,
        surface_m2: row.get(9)?,
        starting_price: row.get(10)?,
        auction_date: row.get(11)?,
        auction_time: row.get(12)?,
        full_address: row.get(13)?,
        latitude: row.get(14)?,
        longitude: row.get(15)?,
        cadastral_ref: row.get(16)?,
        lawyer_name: row.get(17)?,
        lawyer_phone: row.get(18)?,
        case_reference: row.get(19)?,
        views: row.get(20)?,
        favorites: row.get(21)?,
        price_per_m2_min: row.get(22)?,
        price_per_m2_avg: row.get(23)?,
        price_per_m2_max: row.get(24)?,
        status: row.get(25)?,
        is_historical: row.get::<_, i64>(26)? != 0,
        detail_scraped: row.get::<_, i64>(27)? != 0,
        result_status: row.get(28)?,
        final_price: row.get(29)?,
        result_date: row.get(30)?,
        last_scraped_at: row.get(31)?,
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

    fn summary(id: i64) -> ListingSummary {
        ListingSummary {
            licitor_id: id,
            url_path: format!("/annonce/x/{id}.html"),
            department_code: Some("75".to_string()),
            city: Some("Paris".to_string()),
            property_type: Some("Appartement".to_string()),
            description: Some("Un bel appartement".to_string()),
            starting_price: Some(100_000),
            publication_date: Some("2026-01-01".to_string()),
            result_status: None,
            final_price: None,
            result_date: None,
        }
    }

    #[test]
    fn upsert_inserts_then_merges_result_without_overwriting_starting_price() {
        let (_dir, store) = test_store();
        let inserted = store.upsert_listing_summary(&summary(1), None, false, None).unwrap();
        assert!(inserted);

        let mut result_row = summary(1);
        result_row.starting_price = Some(999_999); // must be ignored on update
        result_row.result_status = Some("sold".to_string());
        result_row.final_price = Some(150_000);
        result_row.result_date = Some("2026-02-01".to_string());

        let inserted_again = store.upsert_listing_summary(&result_row, None, true, None).unwrap();
        assert!(!inserted_again);

        let listing = store.get_listing_by_licitor_id(1).unwrap().unwrap();
        assert_eq!(listing.starting_price, Some(100_000));
        assert_eq!(listing.final_price, Some(150_000));
        assert_eq!(listing.result_status.as_deref(), Some("sold"));
        assert_eq!(listing.status, "past");
        assert!(listing.is_historical);
    }

    #[test]
    fn upsert_resolves_tribunal_id_on_insert() {
        let (_dir, store) = test_store();
        store
            .upsert_tribunals(&[crate::scraper::TribunalInfo {
                slug: "tj-paris".to_string(),
                name: "Paris".to_string(),
                region: Some("Île-de-France".to_string()),
                url_path: "/x".to_string(),
                listing_count: 1,
            }])
            .unwrap();

        store
            .upsert_listing_summary(&summary(2), Some("tj-paris"), false, Some("2026-03-01"))
            .unwrap();

        let listing = store.get_listing_by_licitor_id(2).unwrap().unwrap();
        assert_eq!(listing.tribunal_slug.as_deref(), Some("tj-paris"));
        assert_eq!(listing.region.as_deref(), Some("Île-de-France"));
        assert_eq!(listing.status, "upcoming");
    }

    #[test]
    fn backfill_selectors_find_candidates() {
        let (_dir, store) = test_store();
        store.upsert_listing_summary(&summary(3), None, false, None).unwrap();
        assert_eq!(store.get_listings_without_detail(10).unwrap().len(), 1);

        store.update_listing_starting_price(3, 0).unwrap();
        let mut sold = summary(3);
        sold.result_status = Some("sold".to_string());
        store.upsert_listing_summary(&sold, None, true, None).unwrap();

        let candidates = store.get_listings_without_starting_price(10).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].0, 3);
    }
}
