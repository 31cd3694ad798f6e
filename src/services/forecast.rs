//! Forecast document parser.
//!
//! Turns the provider's XML forecast document into one current-conditions
//! record and a time-ordered sequence of forecast records. Structural
//! problems (no `location`, no `tzone`, no `fact/values`) are fatal; a bad
//! value in a single attribute only blanks that field.

use chrono::DateTime;

use crate::errors::ApiError;
use crate::helpers::{parse_float, parse_int};
use crate::models::{ForecastMode, WeatherRecord};
use crate::services::xml::{parse_document, XmlElement};

/// Seconds in one calendar day.
pub const DAY_SECS: i64 = 86_400;

/// Largest provider timezone offset accepted, in minutes either side of UTC.
pub const MAX_TZONE_MINUTES: i64 = 24 * 60;

/// Parsed forecast document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedForecast {
    /// Provider timezone offset, minutes east of UTC
    pub tzone: i64,
    /// Provider's local "now", e.g. `2021-02-21T14:21:00`
    pub cur_time: Option<String>,
    /// Relative link to the provider's nowcast page for this location
    pub nowcast_url: Option<String>,
    pub current: WeatherRecord,
    /// Ascending by `time`, no duplicate timestamps
    pub forecast: Vec<WeatherRecord>,
}

impl ParsedForecast {
    /// Local midnight of the provider's current day, as epoch seconds.
    pub fn today(&self) -> Option<i64> {
        let cur_time = self.cur_time.as_deref()?;
        let date = cur_time.get(..10)?;
        local_to_timestamp(date, self.tzone).ok()
    }
}

/// Convert a provider-local timestamp to epoch seconds.
///
/// `source` is `YYYY-MM-DD` (midnight assumed) or `YYYY-MM-DDTHH:MM:SS`.
/// `tzone` is the offset in minutes east of UTC.
pub fn local_to_timestamp(source: &str, tzone: i64) -> Result<i64, chrono::ParseError> {
    let mut local = source.to_string();
    if local.len() <= 10 {
        local.push_str("T00:00:00");
    }
    let sign = if tzone >= 0 { '+' } else { '-' };
    let (hours, minutes) = (tzone.unsigned_abs() / 60, tzone.unsigned_abs() % 60);
    local.push_str(&format!("{}{:02}:{:02}", sign, hours, minutes));

    Ok(DateTime::parse_from_rfc3339(&local)?.timestamp())
}

/// Local midnight (as epoch seconds) of the day containing `time`.
pub fn day_bucket(time: i64, tzone: i64) -> i64 {
    let offset = tzone.clamp(-MAX_TZONE_MINUTES, MAX_TZONE_MINUTES) * 60;
    let local = time.saturating_add(offset);
    local
        .saturating_sub(local.rem_euclid(DAY_SECS))
        .saturating_sub(offset)
}

/// Parse a forecast document for the given mode.
pub fn parse_forecast(xml: &str, mode: ForecastMode) -> Result<ParsedForecast, ApiError> {
    let root = parse_document(xml).map_err(|e| invalid(&e.to_string()))?;
    let location = root
        .find("location")
        .ok_or_else(|| invalid("no location element"))?;
    let tzone = parse_int(location.attr("tzone")).ok_or_else(|| invalid("no timezone offset"))?;
    if tzone <= -MAX_TZONE_MINUTES || tzone >= MAX_TZONE_MINUTES {
        return Err(invalid(&format!("timezone offset {} out of range", tzone)));
    }

    let fact = location
        .find("fact")
        .ok_or_else(|| invalid("no fact element"))?;
    let fact_values = fact
        .find("values")
        .ok_or_else(|| invalid("no current values"))?;

    let current = WeatherRecord {
        sunrise: parse_int(fact.attr("sunrise")),
        sunset: parse_int(fact.attr("sunset")),
        condition: fact_values.attr("descr").map(str::to_string),
        temperature: parse_float(fact_values.attr("tflt")),
        phenomenon: parse_int(fact_values.attr("ph")),
        water_temperature: parse_float(fact_values.attr("water_t")),
        geomagnetic: parse_int(fact_values.attr("grade")),
        ..common_fields(fact_values)
    };

    let mut forecast = match mode {
        ForecastMode::Hourly => hourly_records(location, tzone),
        ForecastMode::Daily => daily_records(location, tzone),
    };
    forecast.sort_by_key(|r| r.time);
    forecast.dedup_by_key(|r| r.time);

    tracing::debug!(
        "Parsed forecast document: tzone {}, {} {} records",
        tzone,
        forecast.len(),
        mode
    );

    Ok(ParsedForecast {
        tzone,
        cur_time: location.attr("cur_time").map(str::to_string),
        nowcast_url: location.attr("nowcast_url").map(str::to_string),
        current,
        forecast,
    })
}

fn invalid(reason: &str) -> ApiError {
    ApiError::InvalidResponse(format!("can't update weather data: {}", reason))
}

/// Attributes shared by `fact/values`, `forecast/values` and `day` nodes.
fn common_fields(el: &XmlElement) -> WeatherRecord {
    WeatherRecord {
        pressure: parse_int(el.attr("p")),
        humidity: parse_int(el.attr("hum")),
        wind_speed: parse_int(el.attr("ws")),
        wind_bearing: parse_int(el.attr("wd")),
        cloudiness: parse_int(el.attr("cl")),
        precipitation_type: parse_int(el.attr("pt")),
        precipitation_amount: parse_float(el.attr("prflt")),
        precipitation_intensity: parse_int(el.attr("pr")),
        storm: parse_int(el.attr("ts")).map(|ts| ts == 1),
        ..WeatherRecord::default()
    }
}

/// Convert a record's local timestamp, logging and skipping it on failure.
fn record_time(raw: Option<&str>, tzone: i64) -> Option<i64> {
    let raw = raw?;
    match local_to_timestamp(raw, tzone) {
        Ok(time) => Some(time),
        Err(e) => {
            tracing::warn!("Skipping forecast record with bad time '{}': {}", raw, e);
            None
        }
    }
}

fn hourly_records(location: &XmlElement, tzone: i64) -> Vec<WeatherRecord> {
    let mut records = Vec::new();
    for day in location.find_all("day") {
        let sunrise = parse_int(day.attr("sunrise"));
        let sunset = parse_int(day.attr("sunset"));

        for item in day.find_all("forecast") {
            let Some(values) = item.find("values") else {
                continue;
            };
            let Some(time) = record_time(item.attr("valid"), tzone) else {
                continue;
            };
            records.push(WeatherRecord {
                time: Some(time),
                sunrise,
                sunset,
                condition: values.attr("descr").map(str::to_string),
                temperature: parse_float(values.attr("t")),
                geomagnetic: parse_int(values.attr("grade")),
                ..common_fields(values)
            });
        }
    }
    records
}

/// Only days carrying `descr` have a complete summary.
fn daily_records(location: &XmlElement, tzone: i64) -> Vec<WeatherRecord> {
    location
        .find_all("day")
        .into_iter()
        .filter(|day| day.attr("descr").is_some())
        .filter_map(|day| {
            let time = record_time(day.attr("date"), tzone)?;
            Some(WeatherRecord {
                time: Some(time),
                sunrise: parse_int(day.attr("sunrise")),
                sunset: parse_int(day.attr("sunset")),
                condition: day.attr("descr").map(str::to_string),
                temperature: parse_float(day.attr("tmax")),
                temp_low: parse_float(day.attr("tmin")),
                geomagnetic: parse_int(day.attr("grademax")),
                ..common_fields(day)
            })
        })
        .collect()
}
