//! Domain types shared by the page scrapers, the store, and the alert
//! engine. Mirrors `examples/original_source/db/models.py`'s pydantic
//! models, translated field-for-field to serde-derived structs.

use serde::{Deserialize, Serialize};

/// One judicial court page, as discovered by the index or history scraper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TribunalInfo {
    pub slug: String,
    pub name: String,
    pub region: Option<String>,
    pub url_path: String,
    pub listing_count: i64,
}

/// The closed sum of auction outcomes a hearing's result column can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    Sold,
    Carence,
    NonRequise,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Sold => "sold",
            ResultStatus::Carence => "carence",
            ResultStatus::NonRequise => "non_requise",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sold" => Some(ResultStatus::Sold),
            "carence" => Some(ResultStatus::Carence),
            "non_requise" => Some(ResultStatus::NonRequise),
            _ => None,
        }
    }
}

/// Decoded `<p class="Result">` content: a tagged variant, never raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct HearingResult {
    pub status: ResultStatus,
    pub final_price: Option<i64>,
    pub result_date: Option<String>,
}

/// One row of a tribunal/history listing page — what the tribunal and
/// history scrapers both produce before the store merges it in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListingSummary {
    pub licitor_id: i64,
    pub url_path: String,
    pub department_code: Option<String>,
    pub city: Option<String>,
    pub property_type: Option<String>,
    pub description: Option<String>,
    pub starting_price: Option<i64>,
    pub publication_date: Option<String>,

    /// Present only on rows scraped from a results page (history walk).
    pub result_status: Option<String>,
    pub final_price: Option<i64>,
    pub result_date: Option<String>,
}

/// Full extraction from a listing detail page. Every field is best-effort;
/// a missing field is `None`, never a hard failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListingDetail {
    pub licitor_id: i64,

    pub publication_date: Option<String>,
    pub tribunal_slug: Option<String>,

    pub auction_date: Option<String>,
    pub auction_time: Option<String>,

    pub property_type: Option<String>,
    pub description: Option<String>,
    pub cadastral_ref: Option<String>,

    pub starting_price: Option<i64>,

    pub city: Option<String>,
    pub department_code: Option<String>,
    pub full_address: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub lawyer_name: Option<String>,
    pub lawyer_phone: Option<String>,

    pub case_reference: Option<String>,

    pub views: Option<i64>,
    pub favorites: Option<i64>,

    pub surface_m2: Option<f64>,

    pub price_per_m2_min: Option<f64>,
    pub price_per_m2_avg: Option<f64>,
    pub price_per_m2_max: Option<f64>,

    pub energy_rating: Option<String>,
    pub occupancy_status: Option<String>,

    /// Supplemented from the original: free-text "dates de visite" blurb.
    pub visit_date: Option<String>,
    /// Supplemented from the original: whether a price-reduction phrase
    /// ("baisse" / "réduction" / "diminution") appears in the ad.
    pub has_price_reduction: Option<bool>,
}

/// A stored listing row as read back out of the store (joined view used
/// by the alert engine and by CLI reporting).
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: i64,
    pub licitor_id: i64,
    pub url_path: String,
    pub tribunal_slug: Option<String>,
    pub region: Option<String>,
    pub property_type: Option<String>,
    pub department_code: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub surface_m2: Option<f64>,
    pub starting_price: Option<i64>,
    pub auction_date: Option<String>,
    pub auction_time: Option<String>,
    pub full_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub cadastral_ref: Option<String>,
    pub lawyer_name: Option<String>,
    pub lawyer_phone: Option<String>,
    pub case_reference: Option<String>,
    pub views: Option<i64>,
    pub favorites: Option<i64>,
    pub price_per_m2_min: Option<f64>,
    pub price_per_m2_avg: Option<f64>,
    pub price_per_m2_max: Option<f64>,
    pub status: String,
    pub is_historical: bool,
    pub detail_scraped: bool,
    pub result_status: Option<String>,
    pub final_price: Option<i64>,
    pub result_date: Option<String>,
    pub last_scraped_at: Option<String>,
}

/// A saved alert criterion. Unset bounds/sets match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertCriteria {
    pub id: i64,
    pub name: String,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_surface: Option<f64>,
    pub max_surface: Option<f64>,
    pub department_codes: Option<String>,
    pub regions: Option<String>,
    pub property_types: Option<String>,
    pub tribunal_slugs: Option<String>,
    pub is_active: bool,
}

/// Operator-entered manual override for a listing's final price.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjudicationResult {
    pub listing_id: i64,
    pub final_price: i64,
    pub price_source: PriceSource,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Manual,
    External,
    Estimated,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Manual => "manual",
            PriceSource::External => "external",
            PriceSource::Estimated => "estimated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_status_round_trips_through_str() {
        for status in [ResultStatus::Sold, ResultStatus::Carence, ResultStatus::NonRequise] {
            assert_eq!(ResultStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ResultStatus::from_str("bogus"), None);
    }
}
