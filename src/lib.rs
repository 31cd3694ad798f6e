//! Gismeteo weather client.
//!
//! Fetches the Gismeteo XML forecast and 10-day HTML page, normalizes them
//! into [`models::WeatherRecord`]s and derives conditions and metrics.

pub mod config;
pub mod errors;
mod helpers;
pub mod models;
pub mod routes;
pub mod services;

pub use errors::{ApiError, InvalidCoordinatesError};
pub use models::{Condition, ForecastMode, LocationAttributes, WeatherRecord};
pub use services::client::{ClientParams, GismeteoClient};
