//! Saved-search alert matching. Grounded in
//! `examples/original_source/analysis/alerts.py`'s `AlertEngine`.

use crate::db::Store;
use crate::errors::CrawlError;
use crate::scraper::{AlertCriteria, Listing};

/// `true` iff `listing` satisfies every criterion set on `alert`. Unset
/// criteria (`None`/empty string) impose no constraint. A missing price or
/// surface on the listing is treated as `0` for threshold comparisons,
/// matching the original's `listing.get("mise_a_prix") or 0`.
pub fn match_listing(listing: &Listing, alert: &AlertCriteria) -> bool {
    let starting_price = listing.starting_price.unwrap_or(0);
    if let Some(min) = alert.min_price {
        if starting_price < min {
            return false;
        }
    }
    if let Some(max) = alert.max_price {
        if starting_price > max {
            return false;
        }
    }

    if let Some(depts) = csv_terms(&alert.department_codes) {
        let dept = listing.department_code.as_deref().unwrap_or("");
        if !depts.iter().any(|d| d == dept) {
            return false;
        }
    }

    if let Some(types) = csv_terms(&alert.property_types) {
        let listing_type = listing.property_type.as_deref().unwrap_or("").to_lowercase();
        if !types.iter().any(|t| listing_type.contains(&t.to_lowercase())) {
            return false;
        }
    }

    let surface = listing.surface_m2.unwrap_or(0.0);
    if let Some(min) = alert.min_surface {
        if surface < min {
            return false;
        }
    }
    if let Some(max) = alert.max_surface {
        if surface > max {
            return false;
        }
    }

    if let Some(regions) = csv_terms(&alert.regions) {
        let region = listing.region.as_deref().unwrap_or("");
        if !regions.iter().any(|r| r == region) {
            return false;
        }
    }

    if let Some(slugs) = csv_terms(&alert.tribunal_slugs) {
        let slug = listing.tribunal_slug.as_deref().unwrap_or("");
        if !slugs.iter().any(|s| s == slug) {
            return false;
        }
    }

    true
}

fn csv_terms(field: &Option<String>) -> Option<Vec<String>> {
    let raw = field.as_ref()?;
    if raw.trim().is_empty() {
        return None;
    }
    Some(raw.split(',').map(|s| s.trim().to_string()).collect())
}

/// Run every active alert against the given freshly-scraped listings and
/// record matches. Returns the number of `(alert, listing)` pairs matched
/// (including ones already recorded, since the insert is idempotent).
pub fn match_new_listings(store: &Store, licitor_ids: &[i64]) -> Result<usize, CrawlError> {
    let alerts = store.get_active_alerts()?;
    if alerts.is_empty() || licitor_ids.is_empty() {
        return Ok(0);
    }

    let mut matched = 0;
    for &licitor_id in licitor_ids {
        let Some(listing) = store.get_listing_by_licitor_id(licitor_id)? else {
            continue;
        };
        for alert in &alerts {
            if match_listing(&listing, alert) {
                store.insert_alert_match(alert.id, listing.id)?;
                matched += 1;
            }
        }
    }

    if matched > 0 {
        log::info!("alert matching: {matched} new matches");
    }
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_listing() -> Listing {
        Listing {
            id: 1,
            licitor_id: 1,
            url_path: "/annonce/x/1.html".to_string(),
            tribunal_slug: Some("paris".to_string()),
            region: Some("Ile-de-France".to_string()),
            property_type: Some("Appartement T3".to_string()),
            department_code: Some("75".to_string()),
            city: Some("Paris".to_string()),
            description: None,
            surface_m2: Some(65.0),
            starting_price: Some(150_000),
            auction_date: None,
            auction_time: None,
            full_address: None,
            latitude: None,
            longitude: None,
            cadastral_ref: None,
            lawyer_name: None,
            lawyer_phone: None,
            case_reference: None,
            views: None,
            favorites: None,
            price_per_m2_min: None,
            price_per_m2_avg: None,
            price_per_m2_max: None,
            status: "upcoming".to_string(),
            is_historical: false,
            detail_scraped: true,
            result_status: None,
            final_price: None,
            result_date: None,
            last_scraped_at: None,
        }
    }

    fn base_alert() -> AlertCriteria {
        AlertCriteria {
            id: 1,
            name: "test".to_string(),
            min_price: None,
            max_price: None,
            min_surface: None,
            max_surface: None,
            department_codes: None,
            regions: None,
            property_types: None,
            tribunal_slugs: None,
            is_active: true,
        }
    }

    #[test]
    fn empty_criteria_matches_everything() {
        assert!(match_listing(&base_listing(), &base_alert()));
    }

    #[test]
    fn price_range_excludes_out_of_band_listing() {
        let mut alert = base_alert();
        alert.max_price = Some(100_000);
        assert!(!match_listing(&base_listing(), &alert));

        alert.max_price = Some(200_000);
        assert!(match_listing(&base_listing(), &alert));
    }

    #[test]
    fn missing_price_is_treated_as_zero() {
        let mut listing = base_listing();
        listing.starting_price = None;
        let mut alert = base_alert();
        alert.min_price = Some(1);
        assert!(!match_listing(&listing, &alert));
    }

    #[test]
    fn department_codes_require_exact_membership() {
        let mut alert = base_alert();
        alert.department_codes = Some("92, 93".to_string());
        assert!(!match_listing(&base_listing(), &alert));

        alert.department_codes = Some("75, 92".to_string());
        assert!(match_listing(&base_listing(), &alert));
    }

    #[test]
    fn property_types_match_by_substring_case_insensitive() {
        let mut alert = base_alert();
        alert.property_types = Some("maison".to_string());
        assert!(!match_listing(&base_listing(), &alert));

        alert.property_types = Some("APPARTEMENT".to_string());
        assert!(match_listing(&base_listing(), &alert));
    }

    #[test]
    fn regions_require_exact_match() {
        let mut alert = base_alert();
        alert.regions = Some("Bretagne".to_string());
        assert!(!match_listing(&base_listing(), &alert));

        alert.regions = Some("Bretagne, Ile-de-France".to_string());
        assert!(match_listing(&base_listing(), &alert));
    }

    #[test]
    fn tribunal_slugs_require_exact_match() {
        let mut alert = base_alert();
        alert.tribunal_slugs = Some("lyon".to_string());
        assert!(!match_listing(&base_listing(), &alert));

        alert.tribunal_slugs = Some("lyon, paris".to_string());
        assert!(match_listing(&base_listing(), &alert));
    }
}
