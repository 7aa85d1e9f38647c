//! Tribunal scraper: all upcoming listings across a hearing's paginated
//! pages and every other upcoming hearing date reachable from it, with
//! cycle prevention on normalized URLs (spec.md §4.3.2).

use crate::http_client::HttpClient;
use crate::scraper::common::{next_page_url, normalize_path, parse_ad_results, traversing_hearings};
use crate::scraper::models::ListingSummary;
use crate::scraper::ScraperError;
use std::collections::HashSet;

/// Walk a tribunal starting from `start_url`: every paginated page of
/// every upcoming hearing reachable from it, each hearing URL visited at
/// most once.
pub fn scrape(client: &HttpClient, start_url: &str) -> Result<Vec<ListingSummary>, ScraperError> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut pending: Vec<String> = vec![start_url.to_string()];
    let mut out = Vec::new();

    while let Some(url) = pending.pop() {
        let key = normalize_path(&url);
        if !visited.insert(key) {
            continue;
        }

        let (summaries, cross_links) = scrape_hearing_all_pages(client, &url)?;
        out.extend(summaries);

        for link in cross_links {
            let key = normalize_path(&link);
            if !visited.contains(&key) {
                pending.push(link);
            }
        }
    }

    Ok(out)
}

/// Scrape one hearing across all of its `?p=N` pages, plus the
/// cross-hearing links discovered on the first page.
fn scrape_hearing_all_pages(
    client: &HttpClient,
    hearing_url: &str,
) -> Result<(Vec<ListingSummary>, Vec<String>), ScraperError> {
    let mut summaries = Vec::new();
    let mut page_url = hearing_url.to_string();
    let doc = client.fetch(&page_url)?;

    let cross_links: Vec<String> = traversing_hearings(&doc)
        .into_iter()
        .map(|h| h.url_path)
        .collect();

    summaries.extend(parse_ad_results(&doc));

    let mut current = doc;
    loop {
        match next_page_url(&current) {
            Some(next) => {
                page_url = next;
                current = client.fetch(&page_url)?;
                summaries.extend(parse_ad_results(&current));
            }
            None => break,
        }
    }

    Ok((summaries, cross_links))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use scraper::Html;

    fn listing_li(id: i64) -> String {
        format!(
            r#"<li>
                <a class="Ad" href="/annonce/un-appartement/{id}.html">
                    <span class="Number">75</span><span class="City">Paris 16&egrave;me</span>
                    <span class="Name">Un appartement</span><span class="Text">de 58,61 m&sup2;</span>
                    <span class="PriceNumber">220 000 &euro;</span>
                </a>
                <p class="PublishingDate">Mercredi 31 d&eacute;cembre</p>
            </li>"#
        )
    }

    #[test]
    fn parses_results_list_from_fixed_page() {
        let html = format!(
            r#"<html><body><ul class="AdResults">{}{}</ul></body></html>"#,
            listing_li(100001),
            listing_li(100002)
        );
        let doc = Html::parse_document(&html);
        let summaries = parse_ad_results(&doc);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].licitor_id, 100001);
        assert_eq!(summaries[0].department_code.as_deref(), Some("75"));
        assert_eq!(summaries[0].starting_price, Some(220000));
    }

    #[test]
    fn cycle_protection_visits_each_hearing_once() {
        // Two hearing pages that point back at each other via
        // traversing-hearings; walking from either must only count two
        // distinct listing sets, not loop forever.
        let page_a = format!(
            r#"<html><body>
                <div id="traversing-hearings"><ul>
                    <li class="Previous"><a href="/ventes-judiciaires-immobilieres/tj-paris/a.html">prev</a></li>
                    <li><a href="/ventes-judiciaires-immobilieres/tj-paris/b.html">B</a></li>
                </ul></div>
                <ul class="AdResults">{}</ul>
            </body></html>"#,
            listing_li(1)
        );
        let page_b = format!(
            r#"<html><body>
                <div id="traversing-hearings"><ul>
                    <li><a href="/ventes-judiciaires-immobilieres/tj-paris/a.html">A</a></li>
                    <li class="Next"><a href="/ventes-judiciaires-immobilieres/tj-paris/c.html">next</a></li>
                </ul></div>
                <ul class="AdResults">{}</ul>
            </body></html>"#,
            listing_li(2)
        );

        let doc_a = Html::parse_document(&page_a);
        let doc_b = Html::parse_document(&page_b);

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(normalize_path("/ventes-judiciaires-immobilieres/tj-paris/a.html"));
        let cross_from_a: Vec<String> = traversing_hearings(&doc_a)
            .into_iter()
            .map(|h| h.url_path)
            .collect();
        assert_eq!(cross_from_a.len(), 1);
        assert_eq!(cross_from_a[0], "/ventes-judiciaires-immobilieres/tj-paris/b.html");

        let cross_from_b: Vec<String> = traversing_hearings(&doc_b)
            .into_iter()
            .map(|h| h.url_path)
            .collect();
        assert_eq!(cross_from_b.len(), 1);
        assert_eq!(cross_from_b[0], "/ventes-judiciaires-immobilieres/tj-paris/a.html");

        assert!(visited.contains(&normalize_path(&cross_from_b[0])));

        let _ = ScraperConfig::default();
    }
}
