use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Provider location resolved from coordinates (or supplied explicitly).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LocationAttributes {
    /// Provider location identifier
    pub id: Option<i64>,
    /// Provider location name
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Forecast granularity, fixed per client instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMode {
    #[default]
    Hourly,
    Daily,
}

impl ForecastMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMode::Hourly => "hourly",
            ForecastMode::Daily => "daily",
        }
    }
}

impl fmt::Display for ForecastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hourly" => Ok(ForecastMode::Hourly),
            "daily" => Ok(ForecastMode::Daily),
            other => Err(format!("unknown forecast mode '{}'", other)),
        }
    }
}

/// Normalized weather record.
///
/// Used both for current conditions (where `time` and `temp_low` stay `None`)
/// and for forecast entries. Every field is independently nullable; `None`
/// means the provider did not report a usable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct WeatherRecord {
    /// Forecast validity time, epoch seconds (UTC)
    pub time: Option<i64>,
    /// Sunrise, epoch seconds
    pub sunrise: Option<i64>,
    /// Sunset, epoch seconds
    pub sunset: Option<i64>,
    /// Provider condition text
    pub condition: Option<String>,
    /// Air temperature in Celsius
    pub temperature: Option<f64>,
    /// Daily minimum temperature in Celsius (daily mode only)
    pub temp_low: Option<f64>,
    /// Pressure in raw provider units (mmHg)
    pub pressure: Option<i64>,
    /// Relative humidity in percent
    pub humidity: Option<i64>,
    /// Wind speed in metres per second
    pub wind_speed: Option<i64>,
    /// Wind bearing code: 0 = calm, 1..=8 = compass points starting at north
    pub wind_bearing: Option<i64>,
    /// Cloudiness code 0..=3
    pub cloudiness: Option<i64>,
    /// Precipitation type: 0 none, 1 rain, 2 snow, 3 mixed
    pub precipitation_type: Option<i64>,
    /// Precipitation amount in mm
    pub precipitation_amount: Option<f64>,
    /// Precipitation intensity code 0..=3
    pub precipitation_intensity: Option<i64>,
    /// Thunderstorm flag
    pub storm: Option<bool>,
    /// Geomagnetic field index
    pub geomagnetic: Option<i64>,
    /// Provider phenomenon code
    pub phenomenon: Option<i64>,
    /// Water temperature in Celsius
    pub water_temperature: Option<f64>,
    /// Birch allergy index (merged from the auxiliary page)
    pub allergy_birch: Option<i64>,
    /// UV index (merged from the auxiliary page)
    pub uv_index: Option<i64>,
}

/// Allergy / UV values for one day bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuxiliaryValues {
    pub allergy: Option<i64>,
    pub uvb: Option<i64>,
}

/// Derived weather condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum Condition {
    #[serde(rename = "sunny")]
    Sunny,
    #[serde(rename = "clear-night")]
    ClearNight,
    #[serde(rename = "partlycloudy")]
    PartlyCloudy,
    #[serde(rename = "cloudy")]
    Cloudy,
    #[serde(rename = "lightning")]
    Lightning,
    #[serde(rename = "lightning-rainy")]
    LightningRainy,
    #[serde(rename = "rainy")]
    Rainy,
    #[serde(rename = "pouring")]
    Pouring,
    #[serde(rename = "snowy")]
    Snowy,
    #[serde(rename = "snowy-rainy")]
    SnowyRainy,
    #[serde(rename = "windy")]
    Windy,
    #[serde(rename = "windy-variant")]
    WindyVariant,
    #[serde(rename = "fog")]
    Fog,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Sunny => "sunny",
            Condition::ClearNight => "clear-night",
            Condition::PartlyCloudy => "partlycloudy",
            Condition::Cloudy => "cloudy",
            Condition::Lightning => "lightning",
            Condition::LightningRainy => "lightning-rainy",
            Condition::Rainy => "rainy",
            Condition::Pouring => "pouring",
            Condition::Snowy => "snowy",
            Condition::SnowyRainy => "snowy-rainy",
            Condition::Windy => "windy",
            Condition::WindyVariant => "windy-variant",
            Condition::Fog => "fog",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
