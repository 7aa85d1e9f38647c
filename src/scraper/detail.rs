//! Detail-page scraper: the full `ListingDetail` extraction plus two
//! lightweight variants (`scrape_surface`, `scrape_mise_a_prix`) that fetch
//! the same page but only care about one field (spec.md §4.3.3).
//!
//! Grounded in `examples/original_source/scraper/detail_scraper.py`'s
//! `DetailScraper`: same element classes, same fallback order, same
//! best-effort-per-field philosophy (a missing element skips that one
//! field, never the whole scrape).

use crate::http_client::HttpClient;
use crate::parsers::{
    parse_french_date, parse_gps_from_maps_url, parse_licitor_id, parse_price, parse_surface,
    parse_view_count,
};
use crate::scraper::common::text;
use crate::scraper::models::ListingDetail;
use crate::scraper::ScraperError;
use chrono::Datelike;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

fn court_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Tribunal\s+Judiciaire\s+(?:de\s+|d'\s*)([\w\s-]+)").expect("static regex")
    })
}

fn cadastral_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)cadastr[ée]e?\s+section\s+([\w\s°n]+)").expect("static regex")
    })
}

fn mise_a_prix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)mise\s+[àa]\s+prix").expect("static regex"))
}

fn dept_paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^)]+)\)").expect("static regex"))
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2}\s\d{2}\s\d{2}\s\d{2}\s\d{2}|\d{2}\.\d{2}\.\d{2}\.\d{2}\.\d{2})").expect("static regex"))
}

fn rg_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)RG\s+n[°o]\s*([\w/]+)").expect("static regex"))
}

fn views_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d[\d\s.,]+)").expect("static regex"))
}

fn favorites_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[❤♥]\s*([\d\s.,]+)").expect("static regex"))
}

fn ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)R[ée]f\.?\s*([\w/]+)").expect("static regex"))
}

fn price_reduction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)baisse|r[ée]duction|diminution").expect("static regex"))
}

fn dpe_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)DPE\s*[:\s]*([A-G])").expect("static regex"))
}

fn occupancy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(occup[ée]e?|libre|vacant)").expect("static regex"))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn scrape(client: &HttpClient, url_path: &str) -> Result<ListingDetail, ScraperError> {
    let doc = client.fetch(url_path)?;
    parse_detail_document(&doc, url_path)
}

pub fn parse_detail_document(doc: &Html, url_path: &str) -> Result<ListingDetail, ScraperError> {
    let licitor_id = parse_licitor_id(url_path)?;
    let mut detail = ListingDetail {
        licitor_id,
        ..Default::default()
    };

    let ad_content_sel = Selector::parse("div.AdContent").expect("static selector");
    let Some(ad_content) = doc.select(&ad_content_sel).next() else {
        log::warn!("no AdContent found for {url_path}");
        return Ok(detail);
    };

    extract_publication_date(ad_content, &mut detail);
    extract_court(ad_content, &mut detail);
    extract_auction_datetime(ad_content, &mut detail);
    extract_address_block(ad_content, &mut detail);
    extract_lawyer(ad_content, &mut detail);
    extract_case_reference(ad_content, &mut detail);
    extract_reference_blocks(ad_content, &mut detail);

    let full_text = text(ad_content);
    detail.surface_m2 = parse_surface(&full_text);

    extract_partner_offer(doc, &mut detail);
    extract_price_reduction(ad_content, &mut detail);

    if let Some(caps) = dpe_re().captures(&full_text) {
        detail.energy_rating = Some(caps[1].to_uppercase());
    }
    if let Some(caps) = occupancy_re().captures(&full_text) {
        detail.occupancy_status = Some(capitalize(&caps[1]));
    }

    Ok(detail)
}

fn extract_publication_date(ad_content: ElementRef, detail: &mut ListingDetail) {
    let sel = Selector::parse("p.PublishingDate time").expect("static selector");
    if let Some(time_el) = ad_content.select(&sel).next() {
        if let Some(dt) = time_el.value().attr("datetime") {
            if dt.len() >= 10 {
                detail.publication_date = Some(dt[..10].to_string());
            }
        }
    }
}

fn extract_court(ad_content: ElementRef, detail: &mut ListingDetail) {
    let sel = Selector::parse("p.Court").expect("static selector");
    let Some(court_p) = ad_content.select(&sel).next() else {
        return;
    };
    let court_text = text(court_p);
    if let Some(caps) = court_re().captures(&court_text) {
        let city = caps[1].trim().to_string();
        detail.tribunal_slug = Some(format!("tj-{}", city.to_lowercase().replace(' ', "-")));
    }
}

fn extract_auction_datetime(ad_content: ElementRef, detail: &mut ListingDetail) {
    let sel = Selector::parse("p.Date time").expect("static selector");
    let Some(time_el) = ad_content.select(&sel).next() else {
        return;
    };
    let dt_str = time_el.value().attr("datetime").unwrap_or("");
    if let Some((date_part, time_part)) = dt_str.split_once('T') {
        if chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d").is_ok() {
            detail.auction_date = Some(date_part.to_string());
        }
        if time_part.len() >= 5 && time_part.as_bytes()[2] == b':' {
            detail.auction_time = Some(time_part[..5].to_string());
        }
    } else if !dt_str.is_empty() {
        if let Some(parsed) = parse_french_date(&text(time_el), current_year()) {
            detail.auction_date = Some(parsed);
        }
    }
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn extract_address_block(ad_content: ElementRef, detail: &mut ListingDetail) {
    let block_sel = Selector::parse("section.AddressBlock").expect("static selector");
    let Some(block) = ad_content.select(&block_sel).next() else {
        return;
    };

    let lot_sel = Selector::parse("div.Lot").expect("static selector");
    if let Some(lot) = block.select(&lot_sel).next() {
        extract_lot(lot, detail);
    }

    let location_sel = Selector::parse("div.Location").expect("static selector");
    if let Some(location) = block.select(&location_sel).next() {
        extract_location(location, detail);
    }
}

fn extract_lot(lot: ElementRef, detail: &mut ListingDetail) {
    let sous_lot_sel = Selector::parse("div.SousLot").expect("static selector");
    if let Some(sous_lot) = lot.select(&sous_lot_sel).next() {
        let h2_sel = Selector::parse("h2").expect("static selector");
        if let Some(h2) = sous_lot.select(&h2_sel).next() {
            detail.property_type = Some(text(h2));
        }

        let p_sel = Selector::parse("p").expect("static selector");
        let desc_parts: Vec<String> = sous_lot.select(&p_sel).map(text).collect();
        if !desc_parts.is_empty() {
            detail.description = Some(desc_parts.join(" "));
        }

        let sous_lot_text = text(sous_lot);
        if let Some(caps) = cadastral_re().captures(&sous_lot_text) {
            detail.cadastral_ref = Some(caps[1].trim().to_string());
        }
    }

    let h3_sel = Selector::parse("h3").expect("static selector");
    for h3 in lot.select(&h3_sel) {
        let h3_text = text(h3);
        if mise_a_prix_re().is_match(&h3_text) {
            detail.starting_price = parse_price(&h3_text);
            break;
        }
    }
}

fn extract_location(location: ElementRef, detail: &mut ListingDetail) {
    let city_sel = Selector::parse("p.City").expect("static selector");
    if let Some(city_p) = location.select(&city_sel).next() {
        let city_text = text(city_p);
        if let Some(paren) = dept_paren_re().captures(&city_text) {
            let _dept_name = paren[1].to_string();
            if let Some(idx) = city_text.find('(') {
                detail.city = Some(city_text[..idx].trim().to_string());
            } else {
                detail.city = Some(city_text);
            }
        } else {
            detail.city = Some(city_text);
        }
    }

    let street_sel = Selector::parse("p.Street").expect("static selector");
    if let Some(street_p) = location.select(&street_sel).next() {
        detail.full_address = Some(text(street_p));
    }

    let map_sel = Selector::parse(r#"a[href*="maps.google"]"#).expect("static selector");
    if let Some(map_link) = location.select(&map_sel).next() {
        if let Some(href) = map_link.value().attr("href") {
            let (lat, lng) = parse_gps_from_maps_url(href);
            detail.latitude = lat;
            detail.longitude = lng;
        }
    }

    let visits_sel = Selector::parse("p.Visits").expect("static selector");
    if let Some(visits_p) = location.select(&visits_sel).next() {
        detail.visit_date = Some(text(visits_p));
    }
}

fn extract_lawyer(ad_content: ElementRef, detail: &mut ListingDetail) {
    let trusts_sel = Selector::parse("div.Trusts div.Trust").expect("static selector");
    let Some(first_trust) = ad_content.select(&trusts_sel).next() else {
        return;
    };

    let h3_sel = Selector::parse("h3").expect("static selector");
    if let Some(h3) = first_trust.select(&h3_sel).next() {
        detail.lawyer_name = Some(text(h3));
    }

    let trust_text = text(first_trust);
    if let Some(caps) = phone_re().captures(&trust_text) {
        detail.lawyer_phone = Some(caps[1].to_string());
    }
}

fn extract_case_reference(ad_content: ElementRef, detail: &mut ListingDetail) {
    let sel = Selector::parse("p.AdditionalText").expect("static selector");
    for additional in ad_content.select(&sel) {
        let additional_text = text(additional);
        if let Some(caps) = rg_re().captures(&additional_text) {
            detail.case_reference = Some(caps[1].to_string());
            break;
        }
    }
}

fn extract_reference_blocks(ad_content: ElementRef, detail: &mut ListingDetail) {
    let sel = Selector::parse("div.Reference").expect("static selector");
    for ref_div in ad_content.select(&sel) {
        let ref_text = text(ref_div);

        if let Some(fav_caps) = favorites_re().captures(&ref_text) {
            detail.favorites = parse_view_count(&fav_caps[1]);
            if let Some(view_caps) = views_re().captures(&ref_text) {
                detail.views = parse_view_count(&view_caps[1]);
            }
        }

        if detail.case_reference.is_none() {
            if let Some(caps) = ref_re().captures(&ref_text) {
                detail.case_reference = Some(caps[1].to_string());
            }
        }
    }
}

fn extract_partner_offer(doc: &Html, detail: &mut ListingDetail) {
    let partner_sel = Selector::parse("div.PartnerOffer div.PartnerOfferItem").expect("static selector");
    let value_sel = Selector::parse("div.PartnerOfferValue").expect("static selector");

    for item in doc.select(&partner_sel) {
        let label = text(item).to_lowercase();
        let Some(value_div) = item.select(&value_sel).next() else {
            continue;
        };
        let Some(value) = parse_price(&text(value_div)) else {
            continue;
        };
        if label.contains("min") {
            detail.price_per_m2_min = Some(value as f64);
        } else if label.contains("moyen") {
            detail.price_per_m2_avg = Some(value as f64);
        } else if label.contains("max") {
            detail.price_per_m2_max = Some(value as f64);
        }
    }
}

fn extract_price_reduction(ad_content: ElementRef, detail: &mut ListingDetail) {
    let full_text = text(ad_content);
    detail.has_price_reduction = Some(price_reduction_re().is_match(&full_text));
}

/// Lightweight variant: only the surface, from the same `AdContent` text.
pub fn scrape_surface(client: &HttpClient, url_path: &str) -> Result<Option<f64>, ScraperError> {
    let doc = client.fetch(url_path)?;
    let sel = Selector::parse("div.AdContent").expect("static selector");
    Ok(doc.select(&sel).next().and_then(|el| parse_surface(&text(el))))
}

/// Lightweight variant: only the starting price (`Mise à prix`), checking
/// the primary `h3` location and falling back to `h4` (spec.md §4.3.3).
pub fn scrape_mise_a_prix(client: &HttpClient, url_path: &str) -> Result<Option<i64>, ScraperError> {
    let doc = client.fetch(url_path)?;
    let ad_sel = Selector::parse("div.AdContent").expect("static selector");
    let Some(ad_content) = doc.select(&ad_sel).next() else {
        return Ok(None);
    };
    let block_sel = Selector::parse("section.AddressBlock div.Lot").expect("static selector");
    let Some(lot) = ad_content.select(&block_sel).next() else {
        return Ok(None);
    };

    let h3_sel = Selector::parse("h3").expect("static selector");
    for h3 in lot.select(&h3_sel) {
        let h3_text = text(h3);
        if mise_a_prix_re().is_match(&h3_text) {
            return Ok(parse_price(&h3_text));
        }
    }

    let h4_sel = Selector::parse("h4").expect("static selector");
    for h4 in lot.select(&h4_sel) {
        let h4_text = text(h4);
        if mise_a_prix_re().is_match(&h4_text) {
            return Ok(parse_price(&h4_text));
        }
    }

    Ok(None)
}
