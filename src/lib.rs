//! French judicial real-estate auction crawler and data pipeline.
//!
//! Module layout mirrors the teacher crate's `src/{db,scraper}/mod.rs`
//! split: leaf modules (`parsers`, `http_client`) first, page walkers in
//! `scraper`, persistence in `db`, then the cross-cutting `progress` and
//! `alert_engine` modules, and finally `orchestrator`, which composes all
//! of the above into the five job workflows.

pub mod alert_engine;
pub mod config;
pub mod db;
pub mod errors;
pub mod http_client;
pub mod orchestrator;
pub mod parsers;
pub mod progress;
pub mod scraper;

pub use config::AppConfig;
pub use errors::CrawlError;
pub use orchestrator::Orchestrator;
