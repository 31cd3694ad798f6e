//! Nearest provider location lookup by coordinates.

use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::errors::{ApiError, InvalidCoordinatesError};
use crate::helpers::{parse_float, parse_int};
use crate::models::LocationAttributes;
use crate::services::fetcher::Fetcher;
use crate::services::xml::parse_document;

/// Physical locations rarely move; keep lookups for a week.
pub const LOCATION_CACHE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 3600);

/// Validate a coordinate pair. Both values must be finite and in range.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), InvalidCoordinatesError> {
    let valid = latitude.is_finite()
        && longitude.is_finite()
        && latitude.abs() <= 90.0
        && longitude.abs() <= 180.0;
    if valid {
        Ok(())
    } else {
        Err(InvalidCoordinatesError {
            latitude,
            longitude,
        })
    }
}

/// The provider reports some longitudes in 0..360; fold them back to -180..180.
pub fn normalize_longitude(longitude: f64) -> f64 {
    if longitude > 180.0 {
        longitude - 360.0
    } else {
        longitude
    }
}

/// Cache key for a lookup, rounded so jitter in the inputs reuses the entry.
pub fn location_cache_key(latitude: f64, longitude: f64) -> String {
    format!("location_{:.4}_{:.4}.xml", latitude, longitude)
}

/// Parse the provider's city lookup response.
///
/// Expects an `item` element under the root carrying `id`, `n` (name), `lat`
/// and `lng`. A response without a usable `id` is rejected.
pub fn parse_location(xml: &str) -> Result<LocationAttributes, ApiError> {
    let root = parse_document(xml).map_err(|e| {
        ApiError::InvalidResponse(format!("can't retrieve location data: {}", e))
    })?;
    let item = root.find("item").ok_or_else(|| {
        ApiError::InvalidResponse("can't retrieve location data: no item element".to_string())
    })?;

    let id = parse_int(item.attr("id")).ok_or_else(|| {
        ApiError::InvalidResponse("can't retrieve location data: no location id".to_string())
    })?;
    let latitude = parse_float(item.attr("lat")).ok_or_else(|| {
        ApiError::InvalidResponse("can't retrieve location data: bad latitude".to_string())
    })?;
    let longitude = parse_float(item.attr("lng")).ok_or_else(|| {
        ApiError::InvalidResponse("can't retrieve location data: bad longitude".to_string())
    })?;

    Ok(LocationAttributes {
        id: Some(id),
        name: item.attr("n").map(str::to_string),
        latitude,
        longitude: normalize_longitude(longitude),
    })
}

/// Resolve the nearest provider location for a coordinate pair.
pub async fn resolve(
    fetcher: &Fetcher,
    endpoint_url: &str,
    latitude: f64,
    longitude: f64,
) -> Result<LocationAttributes, ApiError> {
    let url = format!(
        "{}/cities/?lat={}&lng={}&count=1&lang=en",
        endpoint_url, latitude, longitude
    );
    let cache_key = location_cache_key(latitude, longitude);

    let response = fetcher
        .fetch(
            &url,
            Some(&cache_key),
            Some(LOCATION_CACHE_MAX_AGE),
            HeaderMap::new(),
        )
        .await?;
    let location = parse_location(&response)?;
    tracing::debug!(
        "Nearest location for {}, {}: {:?} ({:?})",
        latitude,
        longitude,
        location.id,
        location.name
    );
    Ok(location)
}
