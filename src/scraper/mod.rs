//! Page scrapers: pure w.r.t. state (their only input is the DOM, or the
//! `HttpClient` that fetches it). Four walkers per spec.md §4.3, built on
//! a handful of DOM helpers shared in `common`.

mod common;
pub mod detail;
pub mod history;
pub mod index;
pub mod models;
mod scraper_error;
pub mod tribunal;

pub use models::{
    AdjudicationResult, AlertCriteria, HearingResult, Listing, ListingDetail, ListingSummary,
    PriceSource, ResultStatus, TribunalInfo,
};
pub use scraper_error::ScraperError;
