//! DOM helpers shared by the tribunal and history walkers: the `a.Ad` row
//! parser, pagination/traversing-hearings extraction, and URL
//! normalization for cycle prevention. Grounded in the duplicated logic
//! between `examples/original_source/scraper/tribunal_scraper.py` and
//! `scraper/history_scraper.py` (both parse the same `<li><a class="Ad">`
//! shape; this crate shares one implementation instead of the original's
//! two near-identical copies).

use crate::parsers::{parse_licitor_id, parse_price};
use crate::scraper::models::{HearingResult, ListingSummary, ResultStatus};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

fn ddmmyyyy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2})-(\d{2})-(\d{4})").expect("static regex"))
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)").expect("static regex"))
}

pub fn text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// One row parsed from `ul.AdResults > li`: the listing summary fields
/// present on every hearing/results page, plus the decoded result triple
/// when a `p.Result` element is present (history pages only).
pub struct ParsedRow {
    pub summary: ListingSummary,
}

/// Strip query string and fragment, leaving a bare path for the visited-set
/// cycle-prevention keys (spec.md §4.3.2/§4.3.4).
pub fn normalize_path(url: &str) -> String {
    let no_fragment = url.split('#').next().unwrap_or(url);
    no_fragment.split('?').next().unwrap_or(no_fragment).to_string()
}

/// Parse one `<li>` of `ul.AdResults` into a `ListingSummary`. Returns
/// `None` when the row has no `a.Ad` link, the href isn't an `/annonce/`
/// listing, or the `licitor_id` can't be extracted (data-quality skip,
/// not a crawl failure — spec.md §4.3.2).
pub fn parse_listing_li(li: ElementRef) -> Option<ParsedRow> {
    let ad_sel = Selector::parse("a.Ad").expect("static selector");
    let link = li.select(&ad_sel).next()?;
    let href = link.value().attr("href")?.to_string();
    if !href.starts_with("/annonce/") {
        return None;
    }
    let licitor_id = match parse_licitor_id(&href) {
        Ok(id) => id,
        Err(_) => {
            log::warn!("could not parse licitor_id from {href}");
            return None;
        }
    };

    let number_sel = Selector::parse("span.Number").expect("static selector");
    let city_sel = Selector::parse("span.City").expect("static selector");
    let name_sel = Selector::parse("span.Name").expect("static selector");
    let text_sel = Selector::parse("span.Text").expect("static selector");
    let price_sel = Selector::parse("span.PriceNumber").expect("static selector");
    let pub_sel = Selector::parse("p.PublishingDate").expect("static selector");
    let result_sel = Selector::parse("p.Result").expect("static selector");

    let department_code = link.select(&number_sel).next().map(text);
    let city = link.select(&city_sel).next().map(text);
    let property_type = link.select(&name_sel).next().map(text);
    let description = link.select(&text_sel).next().map(text);
    let starting_price = link
        .select(&price_sel)
        .next()
        .and_then(|e| parse_price(&text(e)));
    let publication_date = li
        .select(&pub_sel)
        .next()
        .map(text)
        .filter(|s| !s.is_empty());

    let result = link.select(&result_sel).next().and_then(parse_result_element);

    Some(ParsedRow {
        summary: ListingSummary {
            licitor_id,
            url_path: href,
            department_code,
            city,
            property_type,
            description,
            starting_price,
            publication_date,
            result_status: result.as_ref().map(|r| r.status.as_str().to_string()),
            final_price: result.as_ref().and_then(|r| r.final_price),
            result_date: result.as_ref().and_then(|r| r.result_date.clone()),
        },
    })
}

/// Decode a `<p class="Result">` element per spec.md §4.3.4's three-way
/// rule. `None` covers both "no result text at all" and the ambiguous
/// "date without a price" row, which is skipped rather than guessed at.
pub fn parse_result_element(el: ElementRef) -> Option<HearingResult> {
    let full_text = text(el);
    let lower = full_text.to_lowercase();
    if lower.contains("carence") {
        return Some(HearingResult {
            status: ResultStatus::Carence,
            final_price: None,
            result_date: None,
        });
    }
    if lower.contains("non requise") {
        return Some(HearingResult {
            status: ResultStatus::NonRequise,
            final_price: None,
            result_date: None,
        });
    }

    let price_sel = Selector::parse("span.PriceNumber").expect("static selector");
    let final_price = el
        .select(&price_sel)
        .next()
        .and_then(|e| parse_price(&text(e)));
    let result_date = ddmmyyyy_re()
        .captures(&full_text)
        .map(|c| format!("{}-{}-{}", &c[3], &c[2], &c[1]));

    final_price.map(|price| HearingResult {
        status: ResultStatus::Sold,
        final_price: Some(price),
        result_date,
    })
}

/// Total page count from `span.PageTotal`; defaults to 1 when absent.
pub fn total_pages(doc: &Html) -> usize {
    let sel = Selector::parse("span.PageTotal").expect("static selector");
    doc.select(&sel)
        .next()
        .map(text)
        .and_then(|t| digits_re().captures(&t).map(|c| c[1].to_string()))
        .and_then(|d| d.parse().ok())
        .unwrap_or(1)
}

/// A cross-hearing navigation link from `div#traversing-hearings`.
pub struct HearingLink {
    pub url_path: String,
    pub label: String,
}

/// Every navigable hearing-date link in `#traversing-hearings`, excluding
/// the `Previous`/`Next`/`Empty` nav `<li>`s (spec.md §4.3.2).
pub fn traversing_hearings(doc: &Html) -> Vec<HearingLink> {
    let container_sel = Selector::parse("div#traversing-hearings").expect("static selector");
    let ul_sel = Selector::parse("ul").expect("static selector");
    let a_sel = Selector::parse("a").expect("static selector");
    let count_sel = Selector::parse("span.Count").expect("static selector");

    let mut out = Vec::new();
    let Some(container) = doc.select(&container_sel).next() else {
        return out;
    };
    let Some(ul) = container.select(&ul_sel).next() else {
        return out;
    };

    for child in ul.children() {
        let Some(li) = ElementRef::wrap(child) else {
            continue;
        };
        if li.value().name() != "li" {
            continue;
        }
        if li
            .value()
            .classes()
            .any(|c| matches!(c, "Previous" | "Next" | "Empty"))
        {
            continue;
        }
        let Some(link) = li.select(&a_sel).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let href = href.split('#').next().unwrap_or(href).to_string();
        let mut label = text(link);
        if let Some(count_el) = link.select(&count_sel).next() {
            let count_text = text(count_el);
            label = label.replace(&count_text, "").trim().to_string();
        }
        out.push(HearingLink {
            url_path: href,
            label,
        });
    }
    out
}

/// The "Audiences antérieures" (`li.Next`) link, used by the history
/// walker to step further back in time.
pub fn previous_hearings_url(doc: &Html) -> Option<String> {
    let container_sel = Selector::parse("div#traversing-hearings").expect("static selector");
    let ul_sel = Selector::parse("ul").expect("static selector");
    let a_sel = Selector::parse("a").expect("static selector");

    let container = doc.select(&container_sel).next()?;
    let ul = container.select(&ul_sel).next()?;

    for child in ul.children() {
        let Some(li) = ElementRef::wrap(child) else {
            continue;
        };
        if li.value().name() != "li" {
            continue;
        }
        if !li.value().classes().any(|c| c == "Next") {
            continue;
        }
        if let Some(link) = li.select(&a_sel).next() {
            if let Some(href) = link.value().attr("href") {
                return Some(href.split('#').next().unwrap_or(href).to_string());
            }
        }
    }
    None
}

/// `a.Next.PageNav` pagination link, when present.
pub fn next_page_url(doc: &Html) -> Option<String> {
    let sel = Selector::parse("a.Next.PageNav").expect("static selector");
    doc.select(&sel)
        .next()
        .and_then(|e| e.value().attr("href"))
        .map(|s| s.to_string())
}

/// Parse every direct `<li>` of `ul.AdResults` into a `ListingSummary`,
/// shared by the tribunal and history walkers (both page types use the
/// same result-list markup).
pub fn parse_ad_results(doc: &Html) -> Vec<ListingSummary> {
    let results_sel = Selector::parse("ul.AdResults").expect("static selector");
    let Some(results) = doc.select(&results_sel).next() else {
        log::debug!("no AdResults found on page");
        return Vec::new();
    };

    let mut out = Vec::new();
    for child in results.children() {
        let Some(li) = ElementRef::wrap(child) else {
            continue;
        };
        if li.value().name() != "li" {
            continue;
        }
        if let Some(row) = parse_listing_li(li) {
            out.push(row.summary);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_query_and_fragment() {
        assert_eq!(
            normalize_path("/ventes-judiciaires-immobilieres/tj-paris/2026-02-12.html?p=2#x"),
            "/ventes-judiciaires-immobilieres/tj-paris/2026-02-12.html"
        );
    }

    #[test]
    fn result_sold_from_date_and_price_span() {
        let html = Html::parse_fragment(
            r#"<p class="Result">05-02-2026 : <span class="PriceNumber">58 000 &euro;</span></p>"#,
        );
        let sel = Selector::parse("p.Result").unwrap();
        let el = html.select(&sel).next().unwrap();
        let result = parse_result_element(el).unwrap();
        assert_eq!(result.status, ResultStatus::Sold);
        assert_eq!(result.final_price, Some(58000));
        assert_eq!(result.result_date.as_deref(), Some("2026-02-05"));
    }

    #[test]
    fn result_carence_is_case_insensitive_substring() {
        let html = Html::parse_fragment(r#"<p class="Result">Carence d'ench&egrave;res</p>"#);
        let sel = Selector::parse("p.Result").unwrap();
        let el = html.select(&sel).next().unwrap();
        let result = parse_result_element(el).unwrap();
        assert_eq!(result.status, ResultStatus::Carence);
        assert_eq!(result.final_price, None);
        assert_eq!(result.result_date, None);
    }

    #[test]
    fn result_non_requise() {
        let html = Html::parse_fragment(r#"<p class="Result">Vente non requise</p>"#);
        let sel = Selector::parse("p.Result").unwrap();
        let el = html.select(&sel).next().unwrap();
        let result = parse_result_element(el).unwrap();
        assert_eq!(result.status, ResultStatus::NonRequise);
    }

    #[test]
    fn result_date_without_price_is_ambiguous_and_skipped() {
        let html = Html::parse_fragment(r#"<p class="Result">05-02-2026 : en attente</p>"#);
        let sel = Selector::parse("p.Result").unwrap();
        let el = html.select(&sel).next().unwrap();
        assert!(parse_result_element(el).is_none());
    }
}
