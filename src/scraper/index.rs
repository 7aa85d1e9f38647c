//! Index scraper: the France index page -> one `TribunalInfo` per
//! tribunal link, region inherited from the nearest preceding
//! `<h3><span>` heading (spec.md §4.3.1).

use crate::http_client::HttpClient;
use crate::parsers::extract_tribunal_slug;
use crate::scraper::common::text;
use crate::scraper::models::TribunalInfo;
use crate::scraper::ScraperError;
use scraper::{ElementRef, Html, Selector};

pub fn scrape(client: &HttpClient, index_path: &str) -> Result<Vec<TribunalInfo>, ScraperError> {
    let doc = client.fetch(index_path)?;
    Ok(parse_index_document(&doc))
}

fn nearest_ancestor_li(el: ElementRef) -> Option<ElementRef> {
    let mut node = el.parent();
    while let Some(n) = node {
        if let Some(ancestor) = ElementRef::wrap(n) {
            if ancestor.value().name() == "li" {
                return Some(ancestor);
            }
        }
        node = n.parent();
    }
    None
}

pub fn parse_index_document(doc: &Html) -> Vec<TribunalInfo> {
    let courts_sel = Selector::parse("section#courts").expect("static selector");
    let Some(courts) = doc.select(&courts_sel).next() else {
        log::error!("could not find #courts section");
        return Vec::new();
    };

    let h3_sel = Selector::parse("h3").expect("static selector");
    let span_sel = Selector::parse("span").expect("static selector");
    let tj_link_sel =
        Selector::parse(r#"a[href^="/ventes-judiciaires-immobilieres/tj-"]"#).expect("static selector");
    let count_sel = Selector::parse("span.Count").expect("static selector");

    let mut tribunals = Vec::new();
    let mut current_region = "Unknown".to_string();

    for h3 in courts.select(&h3_sel) {
        if let Some(span) = h3.select(&span_sel).next() {
            current_region = text(span);
        }

        let Some(parent_li) = nearest_ancestor_li(h3) else {
            continue;
        };

        for link in parent_li.select(&tj_link_sel) {
            let href = match link.value().attr("href") {
                Some(h) => h.to_string(),
                None => continue,
            };
            let Some(slug) = extract_tribunal_slug(&href) else {
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
                region: Some(current_region.clone()),
                url_path: href,
                listing_count: count,
            });
        }
    }

    log::info!("found {} tribunals", tribunals.len());
    tribunals
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <html><body>
        <section id="courts">
            <li>
                <h3><span>Île-de-France</span></h3>
                <ul>
                    <li><a href="/ventes-judiciaires-immobilieres/tj-paris/2026-02-12.html">
                        Paris <span class="Count">42</span></a></li>
                    <li><a href="/ventes-judiciaires-immobilieres/tj-versailles/2026-02-12.html">
                        Versailles</a></li>
                </ul>
            </li>
            <li>
                <h3><span>Bretagne</span></h3>
                <ul>
                    <li><a href="/ventes-judiciaires-immobilieres/tj-rennes/2026-02-12.html">
                        Rennes <span class="Count">3</span></a></li>
                </ul>
            </li>
        </section>
        </body></html>
    "#;

    #[test]
    fn extracts_tribunals_with_inherited_region_and_count() {
        let doc = Html::parse_document(FIXTURE);
        let tribunals = parse_index_document(&doc);
        assert_eq!(tribunals.len(), 3);

        let paris = tribunals.iter().find(|t| t.slug == "tj-paris").unwrap();
        assert_eq!(paris.region.as_deref(), Some("Île-de-France"));
        assert_eq!(paris.listing_count, 42);
        assert_eq!(paris.name, "Paris");

        let versailles = tribunals.iter().find(|t| t.slug == "tj-versailles").unwrap();
        assert_eq!(versailles.listing_count, 0);

        let rennes = tribunals.iter().find(|t| t.slug == "tj-rennes").unwrap();
        assert_eq!(rennes.region.as_deref(), Some("Bretagne"));
        assert_eq!(rennes.listing_count, 3);
    }

    #[test]
    fn missing_courts_section_yields_empty_list() {
        let doc = Html::parse_document("<html><body>nothing here</body></html>");
        assert!(parse_index_document(&doc).is_empty());
    }
}
