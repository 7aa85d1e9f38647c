use std::error::Error;
use std::fmt;

/// `Transport` carries the failing URL and, when available, the HTTP status
/// that survived retries — the orchestrator only ever counts it as an
/// item-level error and continues (spec §7).
#[derive(Debug)]
pub enum ScraperError {
    Transport { url: String, status: Option<u16> },
    BadInput(String),
    HtmlParse(String),
}

impl fmt::Display for ScraperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScraperError::Transport { url, status } => match status {
                Some(code) => write!(f, "transport error fetching {url}: HTTP {code}"),
                None => write!(f, "transport error fetching {url}"),
            },
            ScraperError::BadInput(msg) => write!(f, "bad input: {msg}"),
            ScraperError::HtmlParse(msg) => write!(f, "HTML parse error: {msg}"),
        }
    }
}

impl Error for ScraperError {}
