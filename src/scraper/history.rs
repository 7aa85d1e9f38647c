//! History scraper: discover every tribunal with past results, then walk
//! each one backwards through its hearings, following both the "Audiences
//! antérieures" link and any cross-hearing links discovered along the way
//! (spec.md §4.3.4). Grounded in
//! `examples/original_source/scraper/history_scraper.py`'s
//! `HistoryScraper`.

use crate::http_client::HttpClient;
use crate::scraper::common::{
    normalize_path, parse_ad_results, previous_hearings_url, text, total_pages, traversing_hearings,
};
use crate::scraper::models::{ListingSummary, TribunalInfo};
use crate::scraper::ScraperError;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;

const DEFAULT_MAX_HEARINGS_PER_TRIBUNAL: usize = 200;

/// Unlike `parsers::extract_tribunal_slug` (which is deliberately narrowed
/// to `tj-*` for the general tribunal-slug contract), history discovery
/// accepts any shape of slug segment — `tj-*`, `chambre-notaires-*`, etc.
/// (spec.md §4.3.4).
fn discovery_slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/ventes-judiciaires-immobilieres/([^/]+)/").expect("static regex")
    })
}

fn extract_discovery_slug(url_path: &str) -> Option<String> {
    discovery_slug_re()
        .captures(url_path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse the history index page (`#courts`, falling back to
/// `#search-courts` on results pages) into one `TribunalInfo` per tribunal
/// with history data.
pub fn discover_tribunals(client: &HttpClient, history_path: &str) -> Result<Vec<TribunalInfo>, ScraperError> {
    let doc = client.fetch(history_path)?;
    Ok(parse_tribunal_list(&doc))
}

fn parse_tribunal_list(doc: &Html) -> Vec<TribunalInfo> {
    let courts_sel = Selector::parse("section#courts").expect("static selector");
    let search_courts_sel = Selector::parse("section#search-courts").expect("static selector");

    let courts = doc
        .select(&courts_sel)
        .next()
        .or_else(|| doc.select(&search_courts_sel).next());

    let Some(courts) = courts else {
        log::warn!("no courts section found on history page");
        return Vec::new();
    };

    let a_sel = Selector::parse("a[href]").expect("static selector");
    let count_sel = Selector::parse("span.Count").expect("static selector");

    let mut tribunals = Vec::new();
    for link in courts.select(&a_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !href.contains("/ventes-judiciaires-immobilieres/") {
            continue;
        }
        let Some(slug) = extract_discovery_slug(href) else {
            continue;
        };

        let count = link
            .select(&count_sel)
            .next()
            .map(text)
            .filter(|s| s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty())
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);

        let mut name = text(link);
        if let Some(count_el) = link.select(&count_sel).next() {
            let count_text = text(count_el);
            name = name.replace(&count_text, "").trim().to_string();
        }

        tribunals.push(TribunalInfo {
            name,
            slug,
            region: None,
            url_path: normalize_path(href),
            listing_count: count,
        });
    }

    log::info!("discovered {} tribunals with history data", tribunals.len());
    tribunals
}

/// Walk one tribunal's history backwards from `start_url`, bounded by
/// `max_hearings` distinct hearing pages, cycle-protected on normalized
/// URLs. A fetch failure mid-walk stops the walk and returns what was
/// gathered so far rather than discarding it (mirrors the original's
/// try/except-and-break loop body).
pub fn scrape_tribunal_history(
    client: &HttpClient,
    start_url: &str,
    tribunal_slug: &str,
    max_hearings: Option<usize>,
) -> Vec<ListingSummary> {
    let max_hearings = max_hearings.unwrap_or(DEFAULT_MAX_HEARINGS_PER_TRIBUNAL);
    let mut all_summaries = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut hearings_scraped = 0usize;
    let mut current_url = Some(start_url.to_string());

    while let Some(url) = current_url {
        if hearings_scraped >= max_hearings {
            break;
        }
        let key = normalize_path(&url);
        if !visited.insert(key) {
            break;
        }

        log::info!("[{tribunal_slug}] fetching hearing page: {url} (hearings scraped: {hearings_scraped})");
        let doc = match client.fetch(&url) {
            Ok(doc) => doc,
            Err(e) => {
                log::error!("[{tribunal_slug}] failed to fetch {url}: {e}");
                break;
            }
        };

        let hearing_dates = traversing_hearings(&doc);

        all_summaries.extend(paginate_hearing(client, &url, &doc));
        hearings_scraped += 1;

        for hearing in &hearing_dates {
            if hearings_scraped >= max_hearings {
                break;
            }
            let hearing_key = normalize_path(&hearing.url_path);
            if visited.contains(&hearing_key) || hearing_key == normalize_path(&url) {
                continue;
            }
            visited.insert(hearing_key);

            match client.fetch(&hearing.url_path) {
                Ok(hearing_doc) => {
                    let summaries = paginate_hearing(client, &hearing.url_path, &hearing_doc);
                    log::info!(
                        "[{tribunal_slug}] hearing {}: {} listings",
                        hearing.label,
                        summaries.len()
                    );
                    all_summaries.extend(summaries);
                    hearings_scraped += 1;
                }
                Err(e) => {
                    log::error!("[{tribunal_slug}] failed hearing {}: {e}", hearing.url_path);
                }
            }
        }

        current_url = previous_hearings_url(&doc);
    }

    log::info!(
        "[{tribunal_slug}] total: {hearings_scraped} hearings scraped, {} listings found",
        all_summaries.len()
    );
    all_summaries
}

/// Parse an already-fetched hearing page, then fetch and parse any
/// remaining `?p=N` pages.
fn paginate_hearing(client: &HttpClient, hearing_url: &str, first_page: &Html) -> Vec<ListingSummary> {
    let mut summaries = parse_ad_results(first_page);
    let pages = total_pages(first_page);
    let base = hearing_url.split('?').next().unwrap_or(hearing_url);

    for p in 2..=pages {
        let paged = format!("{base}?p={p}");
        match client.fetch(&paged) {
            Ok(doc) => summaries.extend(parse_ad_results(&doc)),
            Err(e) => {
                log::error!("failed to fetch page {p} of {hearing_url}: {e}");
                break;
            }
        }
    }

    summaries
}
