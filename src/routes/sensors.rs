//! Sensor HTTP endpoints.
//!
//! - GET /api/v1/sensors
//! - GET /api/v1/sensors/:kind

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::routes::{ensure_data, AppState};
use crate::services::client::GismeteoClient;
use crate::services::sensors::{sensor_state, SensorKind, SensorState};

/// One sensor with its current state.
#[derive(Debug, Serialize, ToSchema)]
pub struct SensorResponse {
    pub kind: SensorKind,
    /// `{location_id}-{kind}`
    pub unique_id: String,
    /// Display name, e.g. "Razvilka Wind speed"
    pub name: String,
    pub unit_of_measurement: Option<String>,
    pub icon: Option<String>,
    /// Current value: string, number or boolean; `null` when unknown
    #[schema(value_type = Option<Object>)]
    pub state: Option<SensorState>,
}

impl SensorResponse {
    fn build(client: &GismeteoClient, kind: SensorKind) -> Self {
        let attributes = client.attributes();
        let location_key = attributes
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let location_name = attributes.name.as_deref().unwrap_or("Gismeteo");

        Self {
            kind,
            unique_id: kind.unique_id(&location_key),
            name: format!("{} {}", location_name, kind.label()),
            unit_of_measurement: kind.unit().map(str::to_string),
            icon: kind.icon().map(str::to_string),
            state: sensor_state(client, kind),
        }
    }
}

/// List all sensors with their current states.
#[utoipa::path(
    get,
    path = "/api/v1/sensors",
    tag = "Sensors",
    responses(
        (status = 200, description = "All sensors", body = Vec<SensorResponse>),
        (status = 503, description = "No successful update yet", body = ErrorResponse),
    )
)]
pub async fn list_sensors(
    State(state): State<AppState>,
) -> Result<Json<Vec<SensorResponse>>, AppError> {
    let client = state.client.read().await;
    ensure_data(&client)?;
    let sensors = SensorKind::ALL
        .into_iter()
        .map(|kind| SensorResponse::build(&client, kind))
        .collect();
    Ok(Json(sensors))
}

/// Get one sensor by kind, e.g. `wind_speed`.
#[utoipa::path(
    get,
    path = "/api/v1/sensors/{kind}",
    tag = "Sensors",
    params(
        ("kind" = String, Path, description = "Sensor kind, e.g. temperature"),
    ),
    responses(
        (status = 200, description = "Sensor state", body = SensorResponse),
        (status = 404, description = "Unknown sensor kind", body = ErrorResponse),
        (status = 503, description = "No successful update yet", body = ErrorResponse),
    )
)]
pub async fn get_sensor(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<SensorResponse>, AppError> {
    let kind: SensorKind = kind.parse().map_err(AppError::NotFound)?;
    let client = state.client.read().await;
    ensure_data(&client)?;
    Ok(Json(SensorResponse::build(&client, kind)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{empty_state, loaded_state};

    #[tokio::test]
    async fn test_list_sensors() {
        let Json(sensors) = list_sensors(State(loaded_state().await)).await.unwrap();
        assert_eq!(sensors.len(), SensorKind::ALL.len());

        let humidity = sensors
            .iter()
            .find(|s| s.kind == SensorKind::Humidity)
            .unwrap();
        assert_eq!(humidity.unique_id, "167413-humidity");
        assert_eq!(humidity.name, "Gismeteo Humidity");
        assert_eq!(humidity.unit_of_measurement.as_deref(), Some("%"));
        assert_eq!(humidity.state, Some(SensorState::Integer(86)));
    }

    #[tokio::test]
    async fn test_get_sensor() {
        let Json(sensor) = get_sensor(
            State(loaded_state().await),
            Path("wind_speed".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(sensor.kind, SensorKind::WindSpeed);
        assert_eq!(sensor.icon.as_deref(), Some("mdi:weather-windy"));
        assert_eq!(sensor.state, Some(SensorState::Number(3.0)));
    }

    #[tokio::test]
    async fn test_get_unknown_sensor() {
        let result = get_sensor(State(loaded_state().await), Path("pollen".to_string())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sensors_unavailable_before_update() {
        let result = list_sensors(State(empty_state())).await;
        assert!(matches!(result, Err(AppError::Unavailable(_))));
    }
}
