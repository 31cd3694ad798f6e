//! Now-relative forecast window and display formatting.
//!
//! The window keeps only the latest record that already started, followed by
//! every record still in the future. A record whose time equals `now` counts
//! as future.

use chrono::{DateTime, FixedOffset, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Condition, ForecastMode, WeatherRecord};
use crate::services::metrics;

/// Timezone used to render forecast timestamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayTimezone {
    /// Configured IANA zone
    Named(Tz),
    /// Provider-reported UTC offset
    Fixed(FixedOffset),
}

impl DisplayTimezone {
    /// Zone for a provider offset in minutes east of UTC.
    pub fn from_offset_minutes(minutes: i64) -> Option<Self> {
        let secs = i32::try_from(minutes.checked_mul(60)?).ok()?;
        FixedOffset::east_opt(secs).map(DisplayTimezone::Fixed)
    }

    /// Parse an IANA name such as `Europe/Moscow`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.parse::<Tz>() {
            Ok(tz) => Some(DisplayTimezone::Named(tz)),
            Err(_) => {
                tracing::warn!("Unknown timezone '{}', using provider offset", name);
                None
            }
        }
    }

    /// RFC 3339 local time for an epoch timestamp.
    pub fn format(&self, timestamp: i64) -> Option<String> {
        let utc = DateTime::from_timestamp(timestamp, 0)?;
        Some(match self {
            DisplayTimezone::Named(tz) => tz.from_utc_datetime(&utc.naive_utc()).to_rfc3339(),
            DisplayTimezone::Fixed(offset) => {
                offset.from_utc_datetime(&utc.naive_utc()).to_rfc3339()
            }
        })
    }
}

/// Collapse past records to the latest one, then keep all future records.
pub fn window(records: &[WeatherRecord], now: i64) -> Vec<&WeatherRecord> {
    let mut result = Vec::new();
    for record in records {
        let Some(time) = record.time else { continue };
        if time < now {
            result = vec![record];
        } else {
            result.push(record);
        }
    }
    result
}

/// Record at `index` in the current window.
pub fn forecast_data(records: &[WeatherRecord], index: usize, now: i64) -> Option<&WeatherRecord> {
    window(records, now).get(index).copied()
}

/// One forecast entry as shown to users.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ForecastEntry {
    /// Local ISO-8601 timestamp
    pub datetime: String,
    pub condition: Option<Condition>,
    /// Celsius
    pub temperature: Option<f64>,
    /// hPa
    pub pressure: Option<f64>,
    /// Percent
    pub humidity: Option<i64>,
    /// km/h
    pub wind_speed: Option<f64>,
    /// Degrees
    pub wind_bearing: Option<i64>,
    /// mm
    pub precipitation: Option<f64>,
    /// Daily minimum in Celsius (daily mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templow: Option<f64>,
}

/// Build the display forecast from the stored records.
pub fn build_forecast(
    records: &[WeatherRecord],
    mode: ForecastMode,
    timezone: &DisplayTimezone,
    now: i64,
) -> Vec<ForecastEntry> {
    window(records, now)
        .into_iter()
        .filter_map(|record| {
            let datetime = timezone.format(record.time?)?;
            Some(ForecastEntry {
                datetime,
                condition: metrics::condition(record, mode, now),
                temperature: metrics::temperature(record),
                pressure: metrics::pressure_hpa(record),
                humidity: metrics::humidity(record),
                wind_speed: metrics::wind_speed_kmh(record),
                wind_bearing: metrics::wind_bearing(record),
                precipitation: metrics::precipitation_amount(record),
                templow: match mode {
                    ForecastMode::Daily => record.temp_low,
                    ForecastMode::Hourly => None,
                },
            })
        })
        .collect()
}
