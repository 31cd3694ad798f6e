//! Allergy and UV index scraped from the provider's 10-day HTML page.
//!
//! Everything here is best-effort. A page that cannot be fetched or does
//! not have the expected widgets yields no data, never an error.

use reqwest::header::HeaderMap;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

use crate::models::{AuxiliaryValues, WeatherRecord};
use crate::services::fetcher::Fetcher;
use crate::services::forecast::{day_bucket, DAY_SECS};

/// Public site serving the 10-day page.
pub const PARSER_BASE_URL: &str = "https://www.gismeteo.com";

/// Minimum time between two successful page fetches (61 minutes).
pub const AUXILIARY_UPDATE_INTERVAL_SECS: i64 = 61 * 60;

/// Day-bucket epoch -> values for that day.
pub type AuxiliaryData = BTreeMap<i64, AuxiliaryValues>;

/// URL of the 10-day page for a location's nowcast link.
///
/// `/nowcast-razvilka-167413/` becomes `{base}/weather-razvilka-167413/10-days/`.
pub fn parser_url(base_url: &str, nowcast_url: &str) -> Option<String> {
    let slug = nowcast_url.trim_matches('/').get(8..)?;
    if slug.is_empty() {
        return None;
    }
    Some(format!("{}/weather-{}/10-days/", base_url, slug))
}

/// Cache key for the 10-day page of a location.
pub fn auxiliary_cache_key(location_id: i64) -> String {
    format!("forecast_parsed_{}.html", location_id)
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::warn!("Bad CSS selector '{}': {:?}", css, e);
            None
        }
    }
}

/// Extract allergy / UV values keyed by day bucket.
///
/// `today` is local midnight of the provider's current day; widget item `N`
/// maps to `today + N days`. If either widget is missing the page is
/// treated as unusable and nothing is returned.
pub fn parse_auxiliary(html: &str, today: i64) -> AuxiliaryData {
    let doc = Html::parse_document(html);
    let (Some(item_sel), Some(value_sel)) =
        (selector("div.widget__item"), selector("div.widget__value"))
    else {
        return AuxiliaryData::new();
    };

    let mut data = AuxiliaryData::new();
    for key in ["allergy", "uvb"] {
        let Some(container_sel) = selector(&format!("div[data-widget-id=\"{}\"]", key)) else {
            return AuxiliaryData::new();
        };
        let Some(container) = doc.select(&container_sel).next() else {
            tracing::debug!("No '{}' widget on the 10-day page", key);
            return AuxiliaryData::new();
        };

        for item in container.select(&item_sel) {
            let Some(day) = item
                .value()
                .attr("data-item")
                .and_then(|d| d.trim().parse::<i64>().ok())
            else {
                continue;
            };
            let Some(value) = item.select(&value_sel).next().and_then(element_int) else {
                continue;
            };

            let entry = data.entry(today + DAY_SECS * day).or_default();
            match key {
                "allergy" => entry.allergy = Some(value),
                _ => entry.uvb = Some(value),
            }
        }
    }
    data
}

fn element_int(el: ElementRef<'_>) -> Option<i64> {
    let text: String = el.text().collect();
    text.trim().parse().ok()
}

/// Fetch and parse the 10-day page.
///
/// Returns `None` when the page could not be fetched. The page is served to
/// browsers only, so the request carries a browser User-Agent.
pub async fn fetch_auxiliary(
    fetcher: &Fetcher,
    base_url: &str,
    nowcast_url: &str,
    location_id: i64,
    today: i64,
) -> Option<AuxiliaryData> {
    let Some(url) = parser_url(base_url, nowcast_url) else {
        tracing::warn!("Can't derive 10-day page URL from '{}'", nowcast_url);
        return None;
    };

    let cache_key = auxiliary_cache_key(location_id);
    match fetcher
        .fetch(&url, Some(&cache_key), None, Fetcher::browser_headers())
        .await
    {
        Ok(html) => Some(parse_auxiliary(&html, today)),
        Err(e) => {
            tracing::warn!("Can't fetch allergy/UV data from {}: {}", url, e);
            None
        }
    }
}

/// Attach auxiliary values to every record whose local day has an entry.
pub fn merge_auxiliary(records: &mut [WeatherRecord], data: &AuxiliaryData, tzone: i64) {
    if data.is_empty() {
        return;
    }
    for record in records.iter_mut() {
        let Some(time) = record.time else { continue };
        if let Some(values) = data.get(&day_bucket(time, tzone)) {
            record.allergy_birch = values.allergy;
            record.uv_index = values.uvb;
        }
    }
}

/// Minimum-interval guard for the 10-day page, independent of the main
/// refresh cadence. Only successful fetches start a new interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxiliaryThrottle {
    interval_secs: i64,
    last_success: Option<i64>,
}

impl Default for AuxiliaryThrottle {
    fn default() -> Self {
        Self::new(AUXILIARY_UPDATE_INTERVAL_SECS)
    }
}

impl AuxiliaryThrottle {
    pub fn new(interval_secs: i64) -> Self {
        Self {
            interval_secs,
            last_success: None,
        }
    }

    /// Whether a fetch at `now` (epoch seconds) is allowed.
    pub fn is_due(&self, now: i64) -> bool {
        match self.last_success {
            Some(last) => now - last >= self.interval_secs,
            None => true,
        }
    }

    pub fn record_success(&mut self, now: i64) {
        self.last_success = Some(now);
    }

    pub fn last_success(&self) -> Option<i64> {
        self.last_success
    }
}
