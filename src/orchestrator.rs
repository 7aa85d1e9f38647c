//! The five job workflows: `incremental`, `full`, `history`, `detail
//! backfill`, `map (starting-price) backfill`, `surface backfill`. Each
//! wraps one `scrape_log` row and one `ProgressWriter`, with uniform
//! cancellation semantics: the cancel flag is polled at every item-level
//! loop head; observing it raises `CrawlError::Cancelled`, which `run_job`
//! catches, marks the progress record `cancelled`, clears the cancel flag,
//! and finalizes the scrape log with whatever counters were accumulated so
//! far (spec.md §4.6, §5).
//!
//! Grounded in `examples/original_source/scraper/orchestrator.py`'s
//! `ScrapingOrchestrator` for step ordering and phase numbering, translated
//! from its `try/except/finally` shape to an explicit match over
//! `Result<(), CrawlError>` (see SPEC_FULL.md §4.6 — `Drop`-based
//! finalization can't distinguish success/cancelled/error cleanly, so this
//! crate doesn't use it here).

use crate::alert_engine;
use crate::config::AppConfig;
use crate::db::Store;
use crate::errors::CrawlError;
use crate::http_client::HttpClient;
use crate::progress::{self, ProgressWriter};
use crate::scraper::detail;
use crate::scraper::history;
use crate::scraper::index;
use crate::scraper::tribunal;
use crate::scraper::TribunalInfo;

/// Every `Full` backfill phase processes "all remaining" candidates rather
/// than a caller-supplied `--limit` (that flag only exists on the standalone
/// backfill subcommands). Capped, not unbounded, so one `Full` run can't
/// loop forever against a store that never stops growing stale rows.
const FULL_BACKFILL_CAP: i64 = 100_000;

#[derive(Debug, Default, Clone, Copy)]
struct JobStats {
    pages_scraped: i64,
    listings_new: i64,
    listings_updated: i64,
}

pub struct Orchestrator {
    client: HttpClient,
    store: Store,
    cfg: AppConfig,
}

impl Orchestrator {
    pub fn new(cfg: AppConfig) -> Result<Self, CrawlError> {
        let client = HttpClient::new(&cfg.scraper)?;
        let store = Store::new(cfg.store.db_path.clone());
        store.initialize()?;
        Ok(Self { client, store, cfg })
    }

    /// Shared scaffolding for all five workflows: opens the `scrape_log`
    /// row and the progress writer, runs `body`, and finalizes both on every
    /// exit path.
    fn run_job<F>(&self, job_type: &str, body: F) -> Result<(), CrawlError>
    where
        F: FnOnce(&mut ProgressWriter, &mut JobStats) -> Result<(), CrawlError>,
    {
        let log_id = self.store.start_scrape_log(job_type)?;
        let mut writer = ProgressWriter::start(self.cfg.progress.clone(), job_type, 0)?;
        let mut stats = JobStats::default();

        log::info!("{job_type}: starting (scrape_log id {log_id})");
        match body(&mut writer, &mut stats) {
            Ok(()) => {
                writer.finish()?;
                self.store.finish_scrape_log(
                    log_id,
                    stats.pages_scraped,
                    stats.listings_new,
                    stats.listings_updated,
                    writer.errors(),
                    "",
                )?;
                log::info!(
                    "{job_type}: finished ({} new, {} updated, {} errors)",
                    stats.listings_new,
                    stats.listings_updated,
                    writer.errors()
                );
                Ok(())
            }
            Err(CrawlError::Cancelled) => {
                log::warn!("{job_type}: cancel requested, unwinding");
                writer.cancel()?;
                progress::clear_cancel(&self.cfg.progress)?;
                self.store.finish_scrape_log(
                    log_id,
                    stats.pages_scraped,
                    stats.listings_new,
                    stats.listings_updated,
                    writer.errors(),
                    "cancelled by operator",
                )?;
                Ok(())
            }
            Err(e) => {
                log::error!("{job_type}: fatal error: {e}");
                writer.abort(&e.to_string())?;
                self.store.finish_scrape_log(
                    log_id,
                    stats.pages_scraped,
                    stats.listings_new,
                    stats.listings_updated,
                    writer.errors(),
                    &e.to_string(),
                )?;
                Err(e)
            }
        }
    }

    fn check_cancel(writer: &ProgressWriter) -> Result<(), CrawlError> {
        if writer.is_cancel_requested() {
            return Err(CrawlError::Cancelled);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Shared core: index + tribunals, then upcoming hearings + new-listing
    // detail scrape. Used by both `incremental` and `full` (spec.md §4.6:
    // "Full: same as incremental, then three backfill phases").
    // ---------------------------------------------------------------

    fn discover_tribunals(
        &self,
        writer: &mut ProgressWriter,
        stats: &mut JobStats,
    ) -> Result<Vec<TribunalInfo>, CrawlError> {
        let tribunals = index::scrape(&self.client, &self.cfg.scraper.index_path)?;
        self.store.upsert_tribunals(&tribunals)?;
        stats.pages_scraped += 1;
        log::info!("discovered {} tribunals", tribunals.len());
        writer.set_total(tribunals.len() as i64)?;
        Ok(tribunals)
    }

    /// Scrape every tribunal's upcoming hearings, upsert the summaries, and
    /// scrape detail for every `licitor_id` observed for the first time.
    /// Returns the newly-inserted ids (for alert matching).
    fn scan_upcoming(
        &self,
        tribunals: &[TribunalInfo],
        writer: &mut ProgressWriter,
        stats: &mut JobStats,
    ) -> Result<Vec<i64>, CrawlError> {
        let mut new_items: Vec<(i64, String)> = Vec::new();

        for t in tribunals {
            Self::check_cancel(writer)?;

            match tribunal::scrape(&self.client, &t.url_path) {
                Ok(summaries) => {
                    stats.pages_scraped += 1;
                    for summary in summaries {
                        match self.store.upsert_listing_summary(&summary, Some(&t.slug), false, None) {
                            Ok(true) => {
                                stats.listings_new += 1;
                                new_items.push((summary.licitor_id, summary.url_path.clone()));
                                writer.tick(true, false, false, Some(&summary.url_path))?;
                            }
                            Ok(false) => {
                                stats.listings_updated += 1;
                                writer.tick(true, false, false, Some(&summary.url_path))?;
                            }
                            Err(e) => {
                                log::error!("store error for licitor_id {}: {e}", summary.licitor_id);
                                writer.tick(false, true, false, None)?;
                            }
                        }
                    }
                }
                Err(e) => {
                    log::error!("tribunal scrape failed for {}: {e}", t.slug);
                    writer.tick(false, true, false, None)?;
                }
            }
        }

        writer.set_total(new_items.len() as i64)?;
        for (licitor_id, url_path) in &new_items {
            Self::check_cancel(writer)?;
            match detail::scrape(&self.client, url_path) {
                Ok(d) => {
                    self.store.update_listing_detail(&d)?;
                    writer.tick(true, false, false, Some(url_path))?;
                }
                Err(e) => {
                    log::error!("detail scrape failed for licitor_id {licitor_id}: {e}");
                    writer.tick(false, true, false, None)?;
                }
            }
        }

        self.store.mark_past_auctions()?;
        Ok(new_items.into_iter().map(|(id, _)| id).collect())
    }

    pub fn run_incremental(&self) -> Result<(), CrawlError> {
        self.run_job("incremental", |writer, stats| {
            let tribunals = self.discover_tribunals(writer, stats)?;
            Self::check_cancel(writer)?;
            let new_ids = self.scan_upcoming(&tribunals, writer, stats)?;
            alert_engine::match_new_listings(&self.store, &new_ids)?;
            Ok(())
        })
    }

    pub fn run_full(&self) -> Result<(), CrawlError> {
        self.run_job("full_index", |writer, stats| {
            writer.set_phase("Tribunaux", 1, 5)?;
            let tribunals = self.discover_tribunals(writer, stats)?;

            Self::check_cancel(writer)?;
            writer.set_phase("Ventes à venir", 2, 5)?;
            let new_ids = self.scan_upcoming(&tribunals, writer, stats)?;
            alert_engine::match_new_listings(&self.store, &new_ids)?;

            Self::check_cancel(writer)?;
            writer.set_phase("Détails manquants", 3, 5)?;
            self.detail_backfill_pass(writer, stats, FULL_BACKFILL_CAP)?;

            Self::check_cancel(writer)?;
            writer.set_phase("Mises à prix manquantes", 4, 5)?;
            self.map_backfill_pass(writer, stats, FULL_BACKFILL_CAP)?;

            Self::check_cancel(writer)?;
            writer.set_phase("Surfaces manquantes", 5, 5)?;
            self.surface_backfill_pass(writer, stats, FULL_BACKFILL_CAP)?;

            Ok(())
        })
    }

    // ---------------------------------------------------------------
    // History backfill
    // ---------------------------------------------------------------

    pub fn run_history_backfill(
        &self,
        max_hearings: Option<usize>,
        tribunal_slugs: Option<&[String]>,
    ) -> Result<(), CrawlError> {
        self.run_job("history", |writer, stats| {
            let mut tribunals = history::discover_tribunals(&self.client, &self.cfg.scraper.history_path)?;
            stats.pages_scraped += 1;

            if let Some(slugs) = tribunal_slugs {
                tribunals.retain(|t| slugs.iter().any(|s| s == &t.slug));
            }

            writer.set_total(tribunals.len() as i64)?;

            for t in &tribunals {
                Self::check_cancel(writer)?;

                let summaries = history::scrape_tribunal_history(&self.client, &t.url_path, &t.slug, max_hearings);
                stats.pages_scraped += 1;

                let mut any_error = false;
                for summary in &summaries {
                    let auction_date = summary.result_date.as_deref();
                    match self.store.upsert_listing_summary(summary, Some(&t.slug), true, auction_date) {
                        Ok(true) => stats.listings_new += 1,
                        Ok(false) => stats.listings_updated += 1,
                        Err(e) => {
                            log::error!("store error for licitor_id {}: {e}", summary.licitor_id);
                            any_error = true;
                        }
                    }
                }

                writer.tick(!any_error, any_error, false, Some(&t.slug))?;
            }

            Ok(())
        })
    }

    // ---------------------------------------------------------------
    // Field-targeted backfills
    // ---------------------------------------------------------------

    fn detail_backfill_pass(
        &self,
        writer: &mut ProgressWriter,
        stats: &mut JobStats,
        limit: i64,
    ) -> Result<(), CrawlError> {
        let items = self.store.get_listings_without_detail(limit)?;
        writer.set_total(items.len() as i64)?;

        for (licitor_id, url_path) in items {
            Self::check_cancel(writer)?;
            match detail::scrape(&self.client, &url_path) {
                Ok(d) => {
                    self.store.update_listing_detail(&d)?;
                    stats.listings_updated += 1;
                    writer.tick(true, false, false, Some(&url_path))?;
                }
                Err(e) => {
                    log::error!("detail backfill failed for licitor_id {licitor_id}: {e}");
                    writer.tick(false, true, false, None)?;
                }
            }
        }
        Ok(())
    }

    fn map_backfill_pass(
        &self,
        writer: &mut ProgressWriter,
        stats: &mut JobStats,
        limit: i64,
    ) -> Result<(), CrawlError> {
        let items = self.store.get_listings_without_starting_price(limit)?;
        writer.set_total(items.len() as i64)?;

        for (licitor_id, url_path) in items {
            Self::check_cancel(writer)?;
            match detail::scrape_mise_a_prix(&self.client, &url_path) {
                Ok(Some(price)) => {
                    self.store.update_listing_starting_price(licitor_id, price)?;
                    stats.listings_updated += 1;
                    writer.tick(true, false, false, Some(&url_path))?;
                }
                Ok(None) => {
                    writer.tick(false, false, true, Some(&url_path))?;
                }
                Err(e) => {
                    log::error!("mise à prix backfill failed for licitor_id {licitor_id}: {e}");
                    writer.tick(false, true, false, None)?;
                }
            }
        }
        Ok(())
    }

    fn surface_backfill_pass(
        &self,
        writer: &mut ProgressWriter,
        stats: &mut JobStats,
        limit: i64,
    ) -> Result<(), CrawlError> {
        let items = self.store.get_listings_without_surface(limit)?;
        writer.set_total(items.len() as i64)?;

        for (licitor_id, url_path) in items {
            Self::check_cancel(writer)?;
            match detail::scrape_surface(&self.client, &url_path) {
                Ok(Some(surface)) => {
                    self.store.update_listing_surface(licitor_id, surface)?;
                    stats.listings_updated += 1;
                    writer.tick(true, false, false, Some(&url_path))?;
                }
                Ok(None) => {
                    writer.tick(false, false, true, Some(&url_path))?;
                }
                Err(e) => {
                    log::error!("surface backfill failed for licitor_id {licitor_id}: {e}");
                    writer.tick(false, true, false, None)?;
                }
            }
        }
        Ok(())
    }

    pub fn run_detail_backfill(&self, limit: i64) -> Result<(), CrawlError> {
        self.run_job("detail_backfill", |writer, stats| {
            self.detail_backfill_pass(writer, stats, limit)
        })
    }

    pub fn run_map_backfill(&self, limit: i64) -> Result<(), CrawlError> {
        self.run_job("map_backfill", |writer, stats| {
            self.map_backfill_pass(writer, stats, limit)
        })
    }

    pub fn run_surface_backfill(&self, limit: i64) -> Result<(), CrawlError> {
        self.run_job("surface_backfill", |writer, stats| {
            self.surface_backfill_pass(writer, stats, limit)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ProgressConfig, ScraperConfig, StoreConfig};

    fn test_cfg(dir: &std::path::Path) -> AppConfig {
        AppConfig {
            scraper: ScraperConfig::default(),
            store: StoreConfig {
                db_path: dir.join("test.db").to_string_lossy().to_string(),
            },
            progress: ProgressConfig {
                dir: dir.to_string_lossy().to_string(),
                stale_timeout: std::time::Duration::from_secs(120),
            },
        }
    }

    #[test]
    fn new_initializes_store_and_builds_client() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_cfg(dir.path());
        let orchestrator = Orchestrator::new(cfg.clone()).unwrap();
        let store = Store::new(cfg.store.db_path.clone());
        // initialize() is idempotent; calling it again must not error,
        // confirming the orchestrator already ran it once successfully.
        store.initialize().unwrap();
        drop(orchestrator);
    }

    /// Cancellation requested before any network I/O unwinds the workflow
    /// immediately: terminal status `cancelled`, no fatal error propagated.
    #[test]
    fn run_job_honors_pre_set_cancel_flag() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_cfg(dir.path());
        let orchestrator = Orchestrator::new(cfg.clone()).unwrap();

        progress::request_cancel(&cfg.progress).unwrap();
        let result = orchestrator.run_job("incremental", |writer, _stats| {
            Self::check_cancel(writer)?;
            panic!("body must not proceed past the cancel check");
        });
        assert!(result.is_ok());

        let state = progress::read_progress(&cfg.progress).unwrap();
        assert_eq!(state.status, "cancelled");
        assert!(!cfg.progress.cancel_path().exists());
    }

    #[test]
    fn run_job_reports_fatal_errors_and_exits_err() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_cfg(dir.path());
        let orchestrator = Orchestrator::new(cfg.clone()).unwrap();

        let result = orchestrator.run_job("incremental", |_writer, _stats| {
            Err(CrawlError::Io("disk full".to_string()))
        });
        assert!(result.is_err());

        let state = progress::read_progress(&cfg.progress).unwrap();
        assert_eq!(state.status, "error");
        assert!(state.error_message.contains("disk full"));
    }
}
