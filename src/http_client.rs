//! Rate-limited, retrying fetcher built on blocking `reqwest`, returning
//! parsed DOM via the `scraper` crate.
//!
//! Grounded in the teacher's `src/scraper/scraper.rs` retry scaffold
//! (`fetch_html_via_zenrows`/`try_fetch_html_via_zenrows`), generalized to
//! the retry-set status codes and backoff multiplier this crate's config
//! names, and in `examples/original_source/scraper/base.py` for the
//! politeness/pacing contract.

use crate::config::ScraperConfig;
use crate::scraper::ScraperError;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use scraper::Html;
use std::cell::Cell;
use std::time::{Duration, Instant};

const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Fetches a path relative to a fixed base URL, pacing requests and
/// retrying transient failures.
pub struct HttpClient {
    client: Client,
    base_url: String,
    min_delay: f64,
    max_delay: f64,
    max_retries: u32,
    retry_backoff: f64,
    /// Time the previous request's mandatory sleep ended; request pacing
    /// is measured from here, not from a fixed interval.
    last_sleep_ended: Cell<Option<Instant>>,
}

impl HttpClient {
    pub fn new(cfg: &ScraperConfig) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("fr-FR,fr;q=0.9"),
        );

        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .default_headers(headers)
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ScraperError::BadInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            min_delay: cfg.min_delay,
            max_delay: cfg.max_delay,
            max_retries: cfg.max_retries,
            retry_backoff: cfg.retry_backoff,
            last_sleep_ended: Cell::new(None),
        })
    }

    fn rate_limit(&self) {
        let delay = rand::thread_rng().gen_range(self.min_delay..=self.max_delay);
        let target = Duration::from_secs_f64(delay);
        if let Some(prev_end) = self.last_sleep_ended.get() {
            let elapsed = prev_end.elapsed();
            if elapsed < target {
                std::thread::sleep(target - elapsed);
            }
        }
        self.last_sleep_ended.set(Some(Instant::now()));
    }

    /// Fetch `path` (relative to `base_url`) and parse it into a DOM.
    /// Retries on the configured status set and connection errors; fails
    /// with `Transport` once `max_retries` is exhausted.
    pub fn fetch(&self, path: &str) -> Result<Html, ScraperError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_status: Option<u16> = None;

        for attempt in 0..=self.max_retries {
            self.rate_limit();

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp
                            .bytes()
                            .map_err(|_| ScraperError::Transport {
                                url: url.clone(),
                                status: Some(status.as_u16()),
                            })?;
                        let body = String::from_utf8_lossy(&bytes).into_owned();
                        return Ok(Html::parse_document(&body));
                    }

                    last_status = Some(status.as_u16());
                    if !RETRYABLE_STATUSES.contains(&status.as_u16()) {
                        return Err(ScraperError::Transport {
                            url,
                            status: last_status,
                        });
                    }
                }
                Err(_) => {
                    last_status = None;
                }
            }

            if attempt < self.max_retries {
                let backoff = self.retry_backoff.powi(attempt as i32 + 1);
                std::thread::sleep(Duration::from_secs_f64(backoff));
            }
        }

        Err(ScraperError::Transport {
            url,
            status: last_status,
        })
    }
}
