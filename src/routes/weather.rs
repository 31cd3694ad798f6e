//! Weather HTTP endpoints.
//!
//! - GET /api/v1/weather
//! - GET /api/v1/weather/forecast

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::models::{Condition, ForecastMode, LocationAttributes};
use crate::routes::{ensure_data, AppState};
use crate::services::client::GismeteoClient;
use crate::services::window::ForecastEntry;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Current conditions with every derived value.
///
/// Fields the provider did not report are `null`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentWeatherResponse {
    pub location: LocationAttributes,
    /// Weather entity id, `{location_id}-{mode}`
    pub unique_id: Option<String>,
    pub mode: ForecastMode,
    /// Time of the last successful update
    pub updated_at: Option<DateTime<Utc>>,
    pub condition: Option<Condition>,
    /// Provider's own description, e.g. "Mainly cloudy, light snow"
    pub description: Option<String>,
    /// Celsius
    pub temperature: Option<f64>,
    /// Celsius
    pub temperature_feels_like: Option<f64>,
    /// Celsius
    pub water_temperature: Option<f64>,
    pub pressure_mmhg: Option<f64>,
    pub pressure_hpa: Option<f64>,
    /// Percent
    pub humidity: Option<i64>,
    /// Degrees
    pub wind_bearing: Option<i64>,
    pub wind_speed_kmh: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    /// mm
    pub precipitation_amount: Option<f64>,
    /// Cloud cover in percent
    pub clouds: Option<i64>,
    /// mm
    pub rain: Option<f64>,
    /// mm
    pub snow: Option<f64>,
    pub storm: Option<bool>,
    pub geomagnetic: Option<i64>,
    pub allergy_birch: Option<i64>,
    pub uv_index: Option<i64>,
}

impl CurrentWeatherResponse {
    fn from_client(client: &GismeteoClient) -> Self {
        Self {
            location: client.attributes().clone(),
            unique_id: client.unique_id(),
            mode: client.mode(),
            updated_at: client
                .last_updated()
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            condition: client.condition(),
            description: client.current_data().condition.clone(),
            temperature: client.temperature(),
            temperature_feels_like: client.temperature_feels_like(),
            water_temperature: client.water_temperature(),
            pressure_mmhg: client.pressure_mmhg(),
            pressure_hpa: client.pressure_hpa(),
            humidity: client.humidity(),
            wind_bearing: client.wind_bearing(),
            wind_speed_kmh: client.wind_speed_kmh(),
            wind_speed_ms: client.wind_speed_ms(),
            precipitation_amount: client.precipitation_amount(),
            clouds: client.clouds(),
            rain: client.rain(),
            snow: client.snow(),
            storm: client.storm(),
            geomagnetic: client.geomagnetic(),
            allergy_birch: client.allergy_birch(),
            uv_index: client.uv_index(),
        }
    }
}

/// Forecast list from the current slot onward.
#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastResponse {
    pub mode: ForecastMode,
    pub forecast: Vec<ForecastEntry>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Get current weather conditions.
#[utoipa::path(
    get,
    path = "/api/v1/weather",
    tag = "Weather",
    responses(
        (status = 200, description = "Current conditions", body = CurrentWeatherResponse),
        (status = 503, description = "No successful update yet", body = ErrorResponse),
    )
)]
pub async fn get_current_weather(
    State(state): State<AppState>,
) -> Result<Json<CurrentWeatherResponse>, AppError> {
    let client = state.client.read().await;
    ensure_data(&client)?;
    Ok(Json(CurrentWeatherResponse::from_client(&client)))
}

/// Get the forecast.
///
/// The first entry is the slot that is currently in effect, followed by all
/// future slots.
#[utoipa::path(
    get,
    path = "/api/v1/weather/forecast",
    tag = "Weather",
    responses(
        (status = 200, description = "Forecast entries", body = ForecastResponse),
        (status = 503, description = "No successful update yet", body = ErrorResponse),
    )
)]
pub async fn get_forecast(
    State(state): State<AppState>,
) -> Result<Json<ForecastResponse>, AppError> {
    let client = state.client.read().await;
    ensure_data(&client)?;
    Ok(Json(ForecastResponse {
        mode: client.mode(),
        forecast: client.forecast(),
    }))
}
