//! Condition derivation and unit conversions over normalized records.
//!
//! Every function is pure and total: a missing input yields `None`, never a
//! panic. `now` is passed in explicitly wherever the result depends on it.

use crate::helpers::round_1dp;
use crate::models::{Condition, ForecastMode, WeatherRecord};

/// mmHg -> hPa.
pub const MMHG2HPA: f64 = 1.333223684;

/// m/s -> km/h.
pub const MS2KMH: f64 = 3.6;

/// Wind above this speed (m/s) reads as "windy" when nothing else applies.
pub const WINDY_THRESHOLD_MS: f64 = 10.8;

/// Precipitation (mm) assumed for each intensity code when no amount is given.
pub const PRECIPITATION_AMOUNT: [f64; 4] = [0.0, 2.0, 6.0, 16.0];

/// Provider phenomenon codes that mean fog or haze.
pub const FOG_PHENOMENA: [i64; 21] = [
    11, 12, 28, 40, 41, 42, 43, 44, 45, 46, 47, 48, 49, 120, 130, 131, 132, 133, 134, 135, 528,
];

/// Whether `time` falls strictly between sunrise and sunset.
/// Unknown sunrise or sunset counts as night.
pub fn is_daytime(time: i64, sunrise: Option<i64>, sunset: Option<i64>) -> bool {
    match (sunrise, sunset) {
        (Some(sunrise), Some(sunset)) => sunrise < time && time < sunset,
        _ => false,
    }
}

/// Derive the weather condition of a record.
///
/// Cloudiness gives the base, then the first matching override wins:
/// storm, rain, snow, mixed precipitation, strong wind, fog.
/// Returns `None` when cloudiness is unknown.
pub fn condition(record: &WeatherRecord, mode: ForecastMode, now: i64) -> Option<Condition> {
    let cloudiness = record.cloudiness?;

    let base = match cloudiness {
        0 => {
            let time = record.time.unwrap_or(now);
            if mode == ForecastMode::Daily || is_daytime(time, record.sunrise, record.sunset) {
                Condition::Sunny
            } else {
                Condition::ClearNight
            }
        }
        1 | 2 => Condition::PartlyCloudy,
        _ => Condition::Cloudy,
    };

    let precipitation_type = record.precipitation_type;
    let cond = if record.storm == Some(true) {
        if precipitation_type != Some(0) {
            Condition::LightningRainy
        } else {
            Condition::Lightning
        }
    } else if precipitation_type == Some(1) {
        if record.precipitation_intensity == Some(3) {
            Condition::Pouring
        } else {
            Condition::Rainy
        }
    } else if precipitation_type == Some(2) {
        Condition::Snowy
    } else if precipitation_type == Some(3) {
        Condition::SnowyRainy
    } else if wind_speed_ms(record).is_some_and(|ws| ws > WINDY_THRESHOLD_MS) {
        if base == Condition::Cloudy {
            Condition::WindyVariant
        } else {
            Condition::Windy
        }
    } else if cloudiness == 0
        && record
            .phenomenon
            .is_some_and(|ph| FOG_PHENOMENA.contains(&ph))
    {
        Condition::Fog
    } else {
        base
    };

    Some(cond)
}

pub fn temperature(record: &WeatherRecord) -> Option<f64> {
    record.temperature
}

/// Apparent temperature from air temperature, humidity and wind.
///
/// `e = H * 0.06105 * exp(17.27 * T / (237.7 + T))`,
/// `feels = T + 0.348 * e - 0.7 * W - 4.25`.
pub fn temperature_feels_like(record: &WeatherRecord) -> Option<f64> {
    let temp = temperature(record)?;
    let humidity = humidity(record)? as f64;
    let wind = wind_speed_ms(record)?;

    let e = humidity * 0.06105 * ((17.27 * temp) / (237.7 + temp)).exp();
    let feels = temp + 0.348 * e - 0.7 * wind - 4.25;
    Some(round_1dp(feels))
}

pub fn water_temperature(record: &WeatherRecord) -> Option<f64> {
    record.water_temperature
}

pub fn pressure_mmhg(record: &WeatherRecord) -> Option<f64> {
    record.pressure.map(|p| p as f64)
}

/// Pressure in hPa, 1 decimal.
pub fn pressure_hpa(record: &WeatherRecord) -> Option<f64> {
    record.pressure.map(|p| round_1dp(p as f64 * MMHG2HPA))
}

pub fn humidity(record: &WeatherRecord) -> Option<i64> {
    record.humidity
}

/// Wind bearing in degrees. Code 1 is north, each step adds 45°; 0 is calm.
pub fn wind_bearing(record: &WeatherRecord) -> Option<i64> {
    record
        .wind_bearing
        .filter(|&code| code > 0)
        .map(|code| (code - 1) * 45)
}

pub fn wind_speed_ms(record: &WeatherRecord) -> Option<f64> {
    record.wind_speed.map(|ws| ws as f64)
}

/// Wind speed in km/h, 1 decimal.
pub fn wind_speed_kmh(record: &WeatherRecord) -> Option<f64> {
    record.wind_speed.map(|ws| round_1dp(ws as f64 * MS2KMH))
}

pub fn precipitation_amount(record: &WeatherRecord) -> Option<f64> {
    record.precipitation_amount
}

/// Cloud cover in percent.
pub fn clouds(record: &WeatherRecord) -> Option<i64> {
    record.cloudiness.map(|cl| cl * 100 / 3)
}

/// Amount for a precipitation kind: the reported amount if non-zero,
/// otherwise the typical amount for the intensity code.
fn precipitation_of(record: &WeatherRecord, types: [i64; 2]) -> Option<f64> {
    if !record
        .precipitation_type
        .is_some_and(|pt| types.contains(&pt))
    {
        return Some(0.0);
    }
    if let Some(amount) = record.precipitation_amount.filter(|&a| a != 0.0) {
        return Some(amount);
    }
    let intensity = usize::try_from(record.precipitation_intensity?).ok()?;
    PRECIPITATION_AMOUNT.get(intensity).copied()
}

/// Rain in mm. Mixed precipitation counts as rain too.
pub fn rain(record: &WeatherRecord) -> Option<f64> {
    precipitation_of(record, [1, 3])
}

/// Snow in mm. Mixed precipitation counts as snow too.
pub fn snow(record: &WeatherRecord) -> Option<f64> {
    precipitation_of(record, [2, 3])
}

pub fn storm(record: &WeatherRecord) -> Option<bool> {
    record.storm
}

pub fn geomagnetic(record: &WeatherRecord) -> Option<i64> {
    record.geomagnetic
}

pub fn allergy_birch(record: &WeatherRecord) -> Option<i64> {
    record.allergy_birch
}

pub fn uv_index(record: &WeatherRecord) -> Option<i64> {
    record.uv_index
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2021-02-21 14:21 local (+03:00), between the fixture's sunrise and sunset.
    const DAY_NOW: i64 = 1613906460;
    /// Well after the fixture's sunset.
    const NIGHT_NOW: i64 = 1613950000;

    fn current() -> WeatherRecord {
        WeatherRecord {
            sunrise: Some(1613893140),
            sunset: Some(1613929620),
            condition: Some("Mainly cloudy, light snow".to_string()),
            temperature: Some(-7.0),
            pressure: Some(746),
            humidity: Some(86),
            wind_speed: Some(3),
            wind_bearing: Some(5),
            cloudiness: Some(3),
            precipitation_type: Some(2),
            precipitation_amount: Some(0.3),
            precipitation_intensity: Some(1),
            storm: Some(false),
            geomagnetic: Some(3),
            phenomenon: Some(71),
            water_temperature: Some(3.0),
            ..Default::default()
        }
    }

    fn both(data: &WeatherRecord, now: i64) -> (Option<Condition>, Option<Condition>) {
        (
            condition(data, ForecastMode::Hourly, now),
            condition(data, ForecastMode::Daily, now),
        )
    }

    #[test]
    fn test_condition_cascade() {
        assert_eq!(
            condition(&current(), ForecastMode::Hourly, DAY_NOW),
            Some(Condition::Snowy)
        );

        let mut data = current();
        data.cloudiness = None;
        data.precipitation_type = Some(0);
        assert_eq!(both(&data, NIGHT_NOW), (None, None));

        data.cloudiness = Some(0);
        assert_eq!(
            both(&data, NIGHT_NOW),
            (Some(Condition::ClearNight), Some(Condition::Sunny))
        );

        data.cloudiness = Some(1);
        assert_eq!(
            both(&data, NIGHT_NOW),
            (Some(Condition::PartlyCloudy), Some(Condition::PartlyCloudy))
        );

        data.cloudiness = Some(2);
        assert_eq!(
            both(&data, NIGHT_NOW),
            (Some(Condition::PartlyCloudy), Some(Condition::PartlyCloudy))
        );

        data.cloudiness = Some(3);
        assert_eq!(
            both(&data, NIGHT_NOW),
            (Some(Condition::Cloudy), Some(Condition::Cloudy))
        );

        data.storm = Some(true);
        assert_eq!(
            both(&data, NIGHT_NOW),
            (Some(Condition::Lightning), Some(Condition::Lightning))
        );

        data.precipitation_type = Some(1);
        assert_eq!(
            both(&data, NIGHT_NOW),
            (Some(Condition::LightningRainy), Some(Condition::LightningRainy))
        );

        data.storm = Some(false);
        assert_eq!(
            both(&data, NIGHT_NOW),
            (Some(Condition::Rainy), Some(Condition::Rainy))
        );

        data.precipitation_intensity = Some(3);
        assert_eq!(
            both(&data, NIGHT_NOW),
            (Some(Condition::Pouring), Some(Condition::Pouring))
        );

        data.precipitation_type = Some(3);
        assert_eq!(
            both(&data, NIGHT_NOW),
            (Some(Condition::SnowyRainy), Some(Condition::SnowyRainy))
        );

        data.precipitation_type = Some(0);
        data.wind_speed = Some(11);
        assert_eq!(
            both(&data, NIGHT_NOW),
            (Some(Condition::WindyVariant), Some(Condition::WindyVariant))
        );

        data.cloudiness = Some(0);
        assert_eq!(
            both(&data, NIGHT_NOW),
            (Some(Condition::Windy), Some(Condition::Windy))
        );

        data.wind_speed = Some(0);
        for ph in FOG_PHENOMENA {
            data.phenomenon = Some(ph);
            assert_eq!(
                both(&data, NIGHT_NOW),
                (Some(Condition::Fog), Some(Condition::Fog))
            );
        }
    }

    #[test]
    fn test_condition_uses_record_time_for_daylight() {
        let mut data = current();
        data.cloudiness = Some(0);
        data.precipitation_type = Some(0);
        data.phenomenon = None;

        assert_eq!(
            condition(&data, ForecastMode::Hourly, DAY_NOW),
            Some(Condition::Sunny)
        );

        // the record's own time wins over "now"
        data.time = Some(NIGHT_NOW);
        assert_eq!(
            condition(&data, ForecastMode::Hourly, DAY_NOW),
            Some(Condition::ClearNight)
        );

        data.sunrise = None;
        data.time = Some(DAY_NOW);
        assert_eq!(
            condition(&data, ForecastMode::Hourly, DAY_NOW),
            Some(Condition::ClearNight)
        );
    }

    #[test]
    fn test_condition_is_idempotent() {
        let data = current();
        let first = condition(&data, ForecastMode::Hourly, DAY_NOW);
        assert_eq!(first, condition(&data, ForecastMode::Hourly, DAY_NOW));
    }

    #[test]
    fn test_fog_needs_clear_sky() {
        let mut data = current();
        data.precipitation_type = Some(0);
        data.phenomenon = Some(11);
        data.cloudiness = Some(1);
        assert_eq!(
            condition(&data, ForecastMode::Hourly, DAY_NOW),
            Some(Condition::PartlyCloudy)
        );
    }

    #[test]
    fn test_unknown_wind_is_not_windy() {
        let mut data = current();
        data.precipitation_type = Some(0);
        data.wind_speed = None;
        assert_eq!(
            condition(&data, ForecastMode::Hourly, DAY_NOW),
            Some(Condition::Cloudy)
        );
    }

    #[test]
    fn test_temperature_feels_like() {
        assert_eq!(temperature_feels_like(&current()), Some(-12.3));

        let clears: [fn(&mut WeatherRecord); 3] = [
            |r| r.temperature = None,
            |r| r.humidity = None,
            |r| r.wind_speed = None,
        ];
        for clear in clears {
            let mut data = current();
            clear(&mut data);
            assert_eq!(temperature_feels_like(&data), None);
        }
    }

    #[test]
    fn test_unit_conversions() {
        let data = current();
        assert_eq!(temperature(&data), Some(-7.0));
        assert_eq!(water_temperature(&data), Some(3.0));
        assert_eq!(pressure_mmhg(&data), Some(746.0));
        assert_eq!(pressure_hpa(&data), Some(994.6));
        assert_eq!(humidity(&data), Some(86));
        assert_eq!(wind_bearing(&data), Some(180));
        assert_eq!(wind_speed_ms(&data), Some(3.0));
        assert_eq!(wind_speed_kmh(&data), Some(10.8));
        assert_eq!(precipitation_amount(&data), Some(0.3));
        assert_eq!(clouds(&data), Some(100));
        assert_eq!(storm(&data), Some(false));
        assert_eq!(geomagnetic(&data), Some(3));
    }

    #[test]
    fn test_unknown_inputs() {
        let empty = WeatherRecord::default();
        assert_eq!(temperature(&empty), None);
        assert_eq!(pressure_hpa(&empty), None);
        assert_eq!(wind_bearing(&empty), None);
        assert_eq!(wind_speed_kmh(&empty), None);
        assert_eq!(clouds(&empty), None);
        assert_eq!(storm(&empty), None);
        assert_eq!(allergy_birch(&empty), None);
        assert_eq!(uv_index(&empty), None);
    }

    #[test]
    fn test_wind_bearing_codes() {
        let mut data = WeatherRecord::default();
        for (code, degrees) in [(0, None), (1, Some(0)), (3, Some(90)), (8, Some(315))] {
            data.wind_bearing = Some(code);
            assert_eq!(wind_bearing(&data), degrees);
        }
    }

    #[test]
    fn test_clouds_percent() {
        let mut data = WeatherRecord::default();
        for (code, percent) in [(0, 0), (1, 33), (2, 66), (3, 100)] {
            data.cloudiness = Some(code);
            assert_eq!(clouds(&data), Some(percent));
        }
    }

    #[test]
    fn test_rain_and_snow() {
        let mut data = current();
        // snow with an explicit amount
        assert_eq!(rain(&data), Some(0.0));
        assert_eq!(snow(&data), Some(0.3));

        // mixed, amount missing -> intensity table
        data.precipitation_type = Some(3);
        data.precipitation_amount = None;
        data.precipitation_intensity = Some(2);
        assert_eq!(rain(&data), Some(6.0));
        assert_eq!(snow(&data), Some(6.0));

        // zero amount also falls back to the table
        data.precipitation_type = Some(1);
        data.precipitation_amount = Some(0.0);
        data.precipitation_intensity = Some(3);
        assert_eq!(rain(&data), Some(16.0));
        assert_eq!(snow(&data), Some(0.0));

        data.precipitation_intensity = None;
        assert_eq!(rain(&data), None);

        data.precipitation_intensity = Some(7);
        assert_eq!(rain(&data), None);

        data.precipitation_type = None;
        assert_eq!(rain(&data), Some(0.0));
        assert_eq!(snow(&data), Some(0.0));
    }
}
