use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" once weather data is loaded, "degraded" before)
    pub status: String,
    /// API version
    pub version: String,
    /// Whether at least one update has succeeded
    pub data_available: bool,
}

/// Health check endpoint.
///
/// Always 200. Reports "degraded" until the first successful update.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let data_ok = state.client.read().await.has_data();

    Json(HealthResponse {
        status: if data_ok {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        data_available: data_ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{empty_state, loaded_state};

    #[tokio::test]
    async fn test_health_degraded_without_data() {
        let Json(resp) = health_check(State(empty_state())).await;
        assert_eq!(resp.status, "degraded");
        assert!(!resp.data_available);
        assert_eq!(resp.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_health_ok_with_data() {
        let Json(resp) = health_check(State(loaded_state().await)).await;
        assert_eq!(resp.status, "ok");
        assert!(resp.data_available);
    }
}
