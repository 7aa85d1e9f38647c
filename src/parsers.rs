//! Pure text/HTML extractors. No I/O, no logging, no global state.
//!
//! Grounded in `examples/original_source/scraper/parsers.py`: the same
//! regexes, the same month table, the same edge-case behavior.

use crate::scraper::ScraperError;
use regex::Regex;
use std::sync::OnceLock;

fn months_fr(month: &str) -> Option<u32> {
    match month {
        "janvier" => Some(1),
        "fevrier" | "février" => Some(2),
        "mars" => Some(3),
        "avril" => Some(4),
        "mai" => Some(5),
        "juin" => Some(6),
        "juillet" => Some(7),
        "aout" | "août" => Some(8),
        "septembre" => Some(9),
        "octobre" => Some(10),
        "novembre" => Some(11),
        "decembre" | "décembre" => Some(12),
        _ => None,
    }
}

const MONTH_PATTERN: &str =
    "janvier|f[eé]vrier|mars|avril|mai|juin|juillet|ao[uû]t|septembre|octobre|novembre|d[eé]cembre";

fn licitor_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/(\d+)\.html$").expect("static regex"))
}

fn non_digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\d]").expect("static regex"))
}

fn gps_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"q=(-?[\d.]+),(-?[\d.]+)").expect("static regex"))
}

fn surface_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([\d.,]+)\s*m[²2]").expect("static regex"))
}

fn department_city_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2,3})\s+(.+)$").expect("static regex"))
}

fn french_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(\d{{1,2}})\s+({MONTH_PATTERN})(?:\s+(\d{{4}}))?"))
            .expect("static regex")
    })
}

fn auction_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})\s*[hH:]\s*(\d{2})").expect("static regex"))
}

fn tribunal_slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/ventes-judiciaires-immobilieres/(tj-[^/]+)/").expect("static regex")
    })
}

/// Extract the numeric id from a URL like `/annonce/.../106898.html`.
pub fn parse_licitor_id(url_path: &str) -> Result<i64, ScraperError> {
    licitor_id_re()
        .captures(url_path)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .ok_or_else(|| ScraperError::BadInput(format!("cannot extract licitor_id from: {url_path}")))
}

/// Strip everything but digits and parse as euros. Empty input -> `None`.
pub fn parse_price(text: &str) -> Option<i64> {
    if text.is_empty() {
        return None;
    }
    let cleaned = non_digit_re().replace_all(text, "");
    if cleaned.is_empty() {
        None
    } else {
        cleaned.parse::<i64>().ok()
    }
}

/// Extract `(lat, lng)` from a Google Maps URL of the form `q=<lat>,<lng>`.
pub fn parse_gps_from_maps_url(url: &str) -> (Option<f64>, Option<f64>) {
    match gps_re().captures(url) {
        Some(c) => {
            let lat = c.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
            let lng = c.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
            (lat, lng)
        }
        None => (None, None),
    }
}

/// Parse surface text like `"44,02 m²"` or `"134.87 m2"` into square meters.
pub fn parse_surface(text: &str) -> Option<f64> {
    surface_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
}

/// Parse `"75 Paris 16ème"` into `(dept, city)`. Falls back to `(None, text)`
/// when there is no leading department code.
pub fn parse_department_city(location_text: &str) -> (Option<String>, Option<String>) {
    let text = location_text.trim();
    match department_city_re().captures(text) {
        Some(c) => {
            let dept = c.get(1).map(|m| m.as_str().to_string());
            let city = c.get(2).map(|m| m.as_str().trim().to_string());
            (dept, city)
        }
        None => (None, Some(text.to_string())),
    }
}

/// Parse French date text into ISO `YYYY-MM-DD`. Year defaults to
/// `current_year` when absent from the text.
pub fn parse_french_date(text: &str, current_year: i32) -> Option<String> {
    let lower = text.to_lowercase();
    let caps = french_date_re().captures(&lower)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month_str = caps.get(2)?.as_str();
    let month = months_fr(month_str)?;
    let year = match caps.get(3) {
        Some(m) => m.as_str().parse::<i32>().ok()?,
        None => current_year,
    };
    Some(format!("{year:04}-{month:02}-{day:02}"))
}

/// Parse an auction time like `"14h00"`, `"9h30"`, `"14:00"` into `HH:MM`.
pub fn parse_auction_time(text: &str) -> Option<String> {
    let caps = auction_time_re().captures(text)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute = caps.get(2)?.as_str();
    Some(format!("{hour:02}:{minute}"))
}

/// Parse an engagement count like `"13 200"` or `"13200"` into an integer.
pub fn parse_view_count(text: &str) -> Option<i64> {
    parse_price(text)
}

/// Extract `"tj-paris"` from `/ventes-judiciaires-immobilieres/tj-paris/...`.
pub fn extract_tribunal_slug(url_path: &str) -> Option<String> {
    tribunal_slug_re()
        .captures(url_path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
