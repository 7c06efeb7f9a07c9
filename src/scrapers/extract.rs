use crate::models::{MarketSnapshot, PropertyType, SecondaryMetrics};
use crate::scrapers::fetch::location_slug;
use chrono::Utc;
use rand::Rng;
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// National median fallback used when a city has no entry in the lookup table
pub const NATIONAL_MEDIAN_PRICE: i64 = 420_000;

/// Default days-on-market when the page yields nothing usable
pub const DEFAULT_DAYS_ON_MARKET: i64 = 30;

/// Static per-city median price fallbacks, keyed by location slug
const FALLBACK_MEDIAN_PRICES: &[(&str, i64)] = &[
    ("manchester-nh", 445_000),
    ("nashua-nh", 465_000),
    ("concord-nh", 425_000),
    ("portsmouth-nh", 640_000),
    ("salem-nh", 505_000),
    ("boston-ma", 785_000),
    ("austin-tx", 540_000),
    ("phoenix-az", 445_000),
    ("miami-fl", 560_000),
    ("denver-co", 585_000),
    ("seattle-wa", 815_000),
];

/// Containers most likely to hold the headline home-value figures; checked in
/// order before falling back to a whole-document scan
const PRICE_SELECTORS: &[&str] = &["[data-testid*=\"price\"]", "h2", "p", "span"];

/// Supplies the synthetic inventory count.
///
/// The real scraper has no inventory signal to read, so the count is sampled
/// within a fixed band; injecting the sampler keeps derived metrics
/// deterministic under test.
pub trait InventorySampler: Send + Sync {
    fn inventory_count(&self) -> i64;
}

/// Production sampler: uniform draw from the 50..=450 band
pub struct RandomInventory;

impl InventorySampler for RandomInventory {
    fn inventory_count(&self) -> i64 {
        rand::rng().random_range(50..=450)
    }
}

/// Fixed sampler for tests
pub struct FixedInventory(pub i64);

impl InventorySampler for FixedInventory {
    fn inventory_count(&self) -> i64 {
        self.0
    }
}

/// Median price fallback chain step 2: the static city table, then the
/// national constant
pub fn fallback_median_price(city: &str, state: &str) -> i64 {
    let key = location_slug(city, state);
    FALLBACK_MEDIAN_PRICES
        .iter()
        .find(|(slug, _)| *slug == key)
        .map(|(_, price)| *price)
        .unwrap_or(NATIONAL_MEDIAN_PRICE)
}

/// Extract a market snapshot from a home-values page.
///
/// Extraction is best-effort text pattern matching: the first `$<digits>`
/// match becomes the median price, the first `<digits> days` match the
/// days-on-market, the first `<±digits>%` match the price change. Every field
/// has a fallback, so the only `None` case is input too malformed to scan
/// (empty document).
pub fn extract_snapshot(
    html: &str,
    city: &str,
    state: &str,
    property_type: PropertyType,
    sampler: &dyn InventorySampler,
) -> Option<MarketSnapshot> {
    if html.trim().is_empty() {
        warn!("Empty document for {}, {} - nothing to extract", city, state);
        return None;
    }

    let document = Html::parse_document(html);
    let text = document.root_element().text().collect::<Vec<_>>().join(" ");

    let median_price = match scan_selectors_for_price(&document).or_else(|| first_dollar_amount(&text)) {
        Some(price) => price,
        None => {
            let fallback = fallback_median_price(city, state);
            debug!(
                "No price pattern found for {}, {} - using fallback {}",
                city, state, fallback
            );
            fallback
        }
    };

    let average_days_on_market = first_days_count(&text).unwrap_or(DEFAULT_DAYS_ON_MARKET);
    let price_change_percent = first_percent_change(&text).unwrap_or(0.0);

    let inventory_count = sampler.inventory_count();
    let metrics = SecondaryMetrics {
        inventory_count,
        new_listings: inventory_count * 30 / 100,
        pending_sales: inventory_count * 20 / 100,
        sold_properties: inventory_count * 25 / 100,
        price_per_sqft: median_price / 185,
    };

    Some(MarketSnapshot {
        location: format!("{}, {}", city, state),
        property_type,
        median_price,
        average_days_on_market,
        price_change_percent,
        metrics,
        last_updated: Utc::now(),
    })
}

/// Check the likely summary containers first; the first price-like match in
/// document order wins, with no validation that it is actually the home value
fn scan_selectors_for_price(document: &Html) -> Option<i64> {
    for css in PRICE_SELECTORS {
        let selector = match Selector::parse(css) {
            Ok(s) => s,
            Err(_) => continue,
        };
        for element in document.select(&selector) {
            let text = element.text().collect::<Vec<_>>().join(" ");
            if let Some(price) = first_dollar_amount(&text) {
                return Some(price);
            }
        }
    }
    None
}

/// Find the first `$<digits>` pattern and parse it, tolerating comma grouping.
/// Amounts under 1000 are skipped; those are fees or per-sqft figures, not
/// home values.
fn first_dollar_amount(text: &str) -> Option<i64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while let Some(pos) = text[i..].find('$') {
        let start = i + pos + 1;
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b',') {
            end += 1;
        }
        let raw = text[start..end].replace(',', "");
        if let Ok(amount) = raw.parse::<i64>() {
            if amount >= 1000 {
                return Some(amount);
            }
        }
        i = end.max(start);
        if i >= text.len() {
            break;
        }
    }
    None
}

/// Find the first `<digits> days` pattern
fn first_days_count(text: &str) -> Option<i64> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find("day") {
        let abs = offset + pos;
        let before = &text[..abs];
        if let Some(n) = trailing_number(before) {
            if n > 0 && n < 400 {
                return Some(n);
            }
        }
        offset = abs + 3;
    }
    None
}

/// Parse the integer immediately preceding the end of `before`, skipping one
/// trailing space
fn trailing_number(before: &str) -> Option<i64> {
    let bytes = before.trim_end().as_bytes();
    let mut start = bytes.len();
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if start == bytes.len() {
        return None;
    }
    std::str::from_utf8(&bytes[start..]).ok()?.parse::<i64>().ok()
}

/// Find the first `<±digits>%` pattern, sign included
fn first_percent_change(text: &str) -> Option<f64> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find('%') {
        let abs = offset + pos;
        let before = text[..abs].trim_end();

        let mut start = before.len();
        for (idx, c) in before.char_indices().rev() {
            if c.is_ascii_digit() || c == '.' {
                start = idx;
            } else {
                break;
            }
        }
        if start < before.len() {
            let mut number: String = before[start..].to_string();
            let prefix = before[..start].trim_end();
            if prefix.ends_with('-') || prefix.ends_with('−') {
                number.insert(0, '-');
            }
            if let Ok(value) = number.parse::<f64>() {
                if value.abs() <= 100.0 {
                    return Some(value);
                }
            }
        }
        offset = abs + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str, city: &str, state: &str) -> MarketSnapshot {
        extract_snapshot(html, city, state, PropertyType::SingleFamily, &FixedInventory(200))
            .expect("snapshot")
    }

    #[test]
    fn price_pattern_is_extracted() {
        let html = r#"<html><body>
            <h2>The typical home value is $512,300</h2>
            <p>Homes go pending in 18 days on average, up 3.4% over the past year.</p>
        </body></html>"#;
        let snap = extract(html, "Manchester", "NH");
        assert_eq!(snap.median_price, 512_300);
        assert_eq!(snap.average_days_on_market, 18);
        assert_eq!(snap.price_change_percent, 3.4);
    }

    #[test]
    fn negative_percent_keeps_its_sign() {
        let html = "<html><body><p>$400,000 median, values down -2.1% this year</p></body></html>";
        let snap = extract(html, "Concord", "NH");
        assert_eq!(snap.price_change_percent, -2.1);
    }

    #[test]
    fn missing_price_uses_city_fallback() {
        let html = "<html><body><p>No figures here</p></body></html>";
        let snap = extract(html, "Manchester", "NH");
        assert_eq!(snap.median_price, 445_000);
    }

    #[test]
    fn unknown_city_uses_national_fallback() {
        let html = "<html><body><p>Nothing numeric</p></body></html>";
        let snap = extract(html, "Smalltown", "KS");
        assert_eq!(snap.median_price, NATIONAL_MEDIAN_PRICE);
    }

    #[test]
    fn median_price_is_always_positive() {
        for (city, state) in [("Manchester", "NH"), ("Nowhere", "ZZ"), ("Boston", "MA")] {
            let snap = extract("<html><body></body></html>", city, state);
            assert!(snap.median_price > 0);
        }
    }

    #[test]
    fn missing_secondary_signals_use_defaults() {
        let html = "<html><body><p>$350,000</p></body></html>";
        let snap = extract(html, "Nashua", "NH");
        assert_eq!(snap.average_days_on_market, DEFAULT_DAYS_ON_MARKET);
        assert_eq!(snap.price_change_percent, 0.0);
    }

    #[test]
    fn small_dollar_amounts_are_skipped() {
        let html = "<html><body><p>From $99 a month! Typical value $610,000</p></body></html>";
        let snap = extract(html, "Portsmouth", "NH");
        assert_eq!(snap.median_price, 610_000);
    }

    #[test]
    fn derived_metrics_are_fixed_fractions_of_inventory() {
        let html = "<html><body><p>$370,000</p></body></html>";
        let snap = extract(html, "Concord", "NH");
        assert_eq!(snap.metrics.inventory_count, 200);
        assert_eq!(snap.metrics.new_listings, 60);
        assert_eq!(snap.metrics.pending_sales, 40);
        assert_eq!(snap.metrics.sold_properties, 50);
        assert_eq!(snap.metrics.price_per_sqft, 370_000 / 185);
        assert!(snap.metrics.inventory_count >= snap.metrics.new_listings);
        assert!(snap.metrics.inventory_count >= snap.metrics.pending_sales);
        assert!(snap.metrics.inventory_count >= snap.metrics.sold_properties);
    }

    #[test]
    fn empty_document_yields_none() {
        let result = extract_snapshot(
            "   ",
            "Manchester",
            "NH",
            PropertyType::Condo,
            &FixedInventory(100),
        );
        assert!(result.is_none());
    }
}
