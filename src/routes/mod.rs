pub mod coordinator;
pub mod health;
pub mod sensors;
pub mod weather;

use crate::errors::AppError;
use crate::services::client::GismeteoClient;
use crate::services::coordinator::{SharedClient, SharedCoordinatorState};

/// Shared application state for all endpoints.
#[derive(Clone)]
pub struct AppState {
    pub client: SharedClient,
    pub coordinator: SharedCoordinatorState,
}

/// Data endpoints answer 503 until the first successful update.
pub(crate) fn ensure_data(client: &GismeteoClient) -> Result<(), AppError> {
    if client.has_data() {
        Ok(())
    } else {
        Err(AppError::Unavailable(
            "No weather data retrieved yet".to_string(),
        ))
    }
}
