//! Aggregated configuration, injected into the orchestrator rather than
//! read from globals at call sites (spec.md design note, §9).

use std::env;
use std::time::Duration;

/// Rate-limiting, retry, and identification settings for the HTTP client.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub index_path: String,
    pub history_path: String,

    pub min_delay: f64,
    pub max_delay: f64,
    pub max_retries: u32,
    pub retry_backoff: f64,
    pub timeout: Duration,

    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.licitor.com".to_string(),
            index_path: "/ventes-aux-encheres-immobilieres/france.html".to_string(),
            history_path: "/historique-des-adjudications.html".to_string(),
            min_delay: 1.5,
            max_delay: 3.0,
            max_retries: 3,
            retry_backoff: 2.0,
            timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (compatible; EnchImmoBot/1.0; \
                         +mailto:contact@encheres-immo.local)"
                .to_string(),
        }
    }
}

impl ScraperConfig {
    /// Build config from defaults, overridden by environment variables of
    /// the same name (uppercased). A malformed override is ignored (logged
    /// and the default kept) rather than panicking.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_str("BASE_URL") {
            cfg.base_url = v;
        }
        if let Some(v) = env_parsed::<f64>("MIN_DELAY") {
            cfg.min_delay = v;
        }
        if let Some(v) = env_parsed::<f64>("MAX_DELAY") {
            cfg.max_delay = v;
        }
        if let Some(v) = env_parsed::<u32>("MAX_RETRIES") {
            cfg.max_retries = v;
        }
        if let Some(v) = env_parsed::<f64>("RETRY_BACKOFF") {
            cfg.retry_backoff = v;
        }
        if let Some(v) = env_parsed::<u64>("TIMEOUT") {
            cfg.timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_str("USER_AGENT") {
            cfg.user_agent = v;
        }
        cfg
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("ignoring malformed {key}={raw:?}, using default");
                None
            }
        },
        Err(_) => None,
    }
}

/// Location of the sqlite store and its embedded schema.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "data/encheres.db".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_str("DB_PATH") {
            cfg.db_path = v;
        }
        cfg
    }
}

/// Location of the progress/cancel files the UI observes (spec.md §6).
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    pub dir: String,
    /// `is_job_running()` treats a `running` record older than this as dead
    /// (spec.md §4.5).
    pub stale_timeout: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            dir: "data".to_string(),
            stale_timeout: Duration::from_secs(120),
        }
    }
}

impl ProgressConfig {
    pub fn progress_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.dir).join("scrape_progress.json")
    }

    pub fn cancel_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.dir).join("scrape_cancel.flag")
    }
}

/// Top-level config aggregate, constructed once in `main` and threaded
/// through the orchestrator constructor.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub store: StoreConfig,
    pub progress: ProgressConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            scraper: ScraperConfig::from_env(),
            store: StoreConfig::from_env(),
            progress: ProgressConfig::default(),
        }
    }
}
