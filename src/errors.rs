// src/errors.rs
use std::error::Error;
use std::fmt;

/// Errors surfaced by the persistence layer.
#[derive(Debug)]
pub enum StoreError {
    DbError(String),
    NotFound,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DbError(msg) => write!(f, "Store error: {msg}"),
            StoreError::NotFound => write!(f, "Not found"),
        }
    }
}

impl Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::DbError(err.to_string())
    }
}

/// Errors surfaced by the orchestrator / workflow layer. Per-item
/// `Scraper`/`Store` failures are normally caught and turned into counter
/// bumps inside a workflow (spec §7); a `CrawlError` escaping a workflow
/// function means the `Fatal` case — the workflow aborts and `main` reports
/// exit code 1.
#[derive(Debug)]
pub enum CrawlError {
    Scraper(crate::scraper::ScraperError),
    Store(StoreError),
    Io(String),
    /// Raised internally when `is_cancel_requested()` observes the cancel
    /// flag at a loop head. Never escapes a workflow's public entry point —
    /// caught there and turned into a `cancelled` terminal status (spec §6,
    /// §7: cancellation exits 0, it is not the `Fatal` case).
    Cancelled,
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlError::Scraper(e) => write!(f, "{e}"),
            CrawlError::Store(e) => write!(f, "{e}"),
            CrawlError::Io(e) => write!(f, "I/O error: {e}"),
            CrawlError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl Error for CrawlError {}

impl From<crate::scraper::ScraperError> for CrawlError {
    fn from(err: crate::scraper::ScraperError) -> Self {
        CrawlError::Scraper(err)
    }
}

impl From<StoreError> for CrawlError {
    fn from(err: StoreError) -> Self {
        CrawlError::Store(err)
    }
}

impl From<std::io::Error> for CrawlError {
    fn from(err: std::io::Error) -> Self {
        CrawlError::Io(err.to_string())
    }
}
