//! Coordinator status HTTP endpoint.
//!
//! GET /api/v1/coordinator/status returns the state of the background
//! update coordinator as JSON.

use axum::extract::State;
use axum::Json;

use crate::routes::AppState;
use crate::services::coordinator::CoordinatorState;

/// Get the current coordinator status.
///
/// Returns the outcome of the last update cycle, failure counters and the
/// time of the next scheduled refresh.
#[utoipa::path(
    get,
    path = "/api/v1/coordinator/status",
    tag = "Coordinator",
    responses(
        (status = 200, description = "Current coordinator status", body = CoordinatorState),
    )
)]
pub async fn get_coordinator_status(State(state): State<AppState>) -> Json<CoordinatorState> {
    let s = state.coordinator.read().await;
    Json(s.clone())
}
