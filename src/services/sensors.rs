//! Per-metric sensor catalog.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::services::client::GismeteoClient;

/// Sensors exposed for a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Weather,
    Forecast,
    Temperature,
    WindSpeed,
    WindBearing,
    Humidity,
    Pressure,
    Clouds,
    Rain,
    Snow,
    Storm,
    Geomagnetic,
    WaterTemperature,
}

impl SensorKind {
    pub const ALL: [SensorKind; 13] = [
        SensorKind::Weather,
        SensorKind::Forecast,
        SensorKind::Temperature,
        SensorKind::WindSpeed,
        SensorKind::WindBearing,
        SensorKind::Humidity,
        SensorKind::Pressure,
        SensorKind::Clouds,
        SensorKind::Rain,
        SensorKind::Snow,
        SensorKind::Storm,
        SensorKind::Geomagnetic,
        SensorKind::WaterTemperature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Weather => "weather",
            SensorKind::Forecast => "forecast",
            SensorKind::Temperature => "temperature",
            SensorKind::WindSpeed => "wind_speed",
            SensorKind::WindBearing => "wind_bearing",
            SensorKind::Humidity => "humidity",
            SensorKind::Pressure => "pressure",
            SensorKind::Clouds => "clouds",
            SensorKind::Rain => "rain",
            SensorKind::Snow => "snow",
            SensorKind::Storm => "storm",
            SensorKind::Geomagnetic => "geomagnetic",
            SensorKind::WaterTemperature => "water_temperature",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SensorKind::Weather => "Condition",
            SensorKind::Forecast => "Forecast",
            SensorKind::Temperature => "Temperature",
            SensorKind::WindSpeed => "Wind speed",
            SensorKind::WindBearing => "Wind bearing",
            SensorKind::Humidity => "Humidity",
            SensorKind::Pressure => "Pressure",
            SensorKind::Clouds => "Cloud coverage",
            SensorKind::Rain => "Rain",
            SensorKind::Snow => "Snow",
            SensorKind::Storm => "Storm",
            SensorKind::Geomagnetic => "Geomagnetic field",
            SensorKind::WaterTemperature => "Water Temperature",
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            SensorKind::Temperature | SensorKind::WaterTemperature => Some("°C"),
            SensorKind::WindSpeed => Some("m/s"),
            SensorKind::WindBearing => Some("°"),
            SensorKind::Humidity | SensorKind::Clouds => Some("%"),
            SensorKind::Pressure => Some("hPa"),
            SensorKind::Rain | SensorKind::Snow => Some("mm"),
            _ => None,
        }
    }

    pub fn icon(&self) -> Option<&'static str> {
        match self {
            SensorKind::WindSpeed | SensorKind::WindBearing => Some("mdi:weather-windy"),
            SensorKind::Clouds => Some("mdi:weather-partly-cloudy"),
            SensorKind::Rain => Some("mdi:weather-rainy"),
            SensorKind::Snow => Some("mdi:weather-snowy"),
            SensorKind::Storm => Some("mdi:weather-lightning"),
            SensorKind::Geomagnetic => Some("mdi:magnet-on"),
            _ => None,
        }
    }

    /// Sensor entity id, e.g. `167413-wind_speed`.
    pub fn unique_id(&self, location_key: &str) -> String {
        format!("{}-{}", location_key, self.as_str()).to_lowercase()
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown sensor '{}'", s))
    }
}

/// Sensor value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorState {
    Text(String),
    Integer(i64),
    Number(f64),
    Flag(bool),
}

/// Current value of a sensor, `None` when unknown.
pub fn sensor_state(client: &GismeteoClient, kind: SensorKind) -> Option<SensorState> {
    match kind {
        SensorKind::Weather => client
            .condition()
            .map(|c| SensorState::Text(c.as_str().to_string())),
        SensorKind::Forecast => client
            .forecast()
            .into_iter()
            .next()
            .and_then(|entry| entry.condition)
            .map(|c| SensorState::Text(c.as_str().to_string())),
        SensorKind::Temperature => client.temperature().map(SensorState::Number),
        SensorKind::WindSpeed => client.wind_speed_ms().map(SensorState::Number),
        SensorKind::WindBearing => client.wind_bearing().map(SensorState::Integer),
        SensorKind::Humidity => client.humidity().map(SensorState::Integer),
        SensorKind::Pressure => client.pressure_hpa().map(SensorState::Number),
        SensorKind::Clouds => client.clouds().map(SensorState::Integer),
        SensorKind::Rain => client.rain().map(SensorState::Number),
        SensorKind::Snow => client.snow().map(SensorState::Number),
        SensorKind::Storm => client.storm().map(SensorState::Flag),
        SensorKind::Geomagnetic => client.geomagnetic().map(SensorState::Integer),
        SensorKind::WaterTemperature => client.water_temperature().map(SensorState::Number),
    }
}
