use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::models::ForecastMode;
use crate::services::client::{ClientParams, DEFAULT_CACHE_TIME_SECS, DEFAULT_DOMAIN};
use crate::services::coordinator::DEFAULT_UPDATE_INTERVAL_SECS;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Explicit provider location id; skips the coordinate lookup.
    pub location_id: Option<i64>,
    pub mode: ForecastMode,
    /// IANA timezone for forecast timestamps.
    pub timezone: Option<String>,
    /// Response cache directory; caching is off when unset.
    pub cache_dir: Option<PathBuf>,
    pub cache_time_secs: u64,
    pub clean_cache: bool,
    pub update_interval_secs: u64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let location_id = parse_opt::<i64>(&get, "GISMETEO_LOCATION_ID")?;
        let latitude = parse_opt::<f64>(&get, "GISMETEO_LATITUDE")?;
        let longitude = parse_opt::<f64>(&get, "GISMETEO_LONGITUDE")?;
        let (latitude, longitude) = match (latitude, longitude, location_id) {
            (Some(lat), Some(lon), _) => (lat, lon),
            // an explicit id makes coordinates informational only
            (None, None, Some(_)) => (0.0, 0.0),
            (None, _, _) => return Err(ConfigError::Missing("GISMETEO_LATITUDE".to_string())),
            (_, None, _) => return Err(ConfigError::Missing("GISMETEO_LONGITUDE".to_string())),
        };

        Ok(Self {
            latitude,
            longitude,
            location_id,
            mode: parse_opt::<ForecastMode>(&get, "GISMETEO_MODE")?.unwrap_or_default(),
            timezone: get("GISMETEO_TIMEZONE"),
            cache_dir: get("GISMETEO_CACHE_DIR").map(PathBuf::from),
            cache_time_secs: parse_opt(&get, "GISMETEO_CACHE_TIME")?
                .unwrap_or(DEFAULT_CACHE_TIME_SECS),
            clean_cache: parse_opt(&get, "GISMETEO_CLEAN_CACHE")?.unwrap_or(false),
            update_interval_secs: parse_opt(&get, "GISMETEO_UPDATE_INTERVAL")?
                .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS),
            port: parse_opt(&get, "PORT")?.unwrap_or(8080),
        })
    }

    /// Client settings derived from this configuration.
    pub fn client_params(&self) -> ClientParams {
        ClientParams {
            timezone: self.timezone.clone(),
            cache_dir: self.cache_dir.clone(),
            cache_time: Duration::from_secs(self.cache_time_secs),
            domain: DEFAULT_DOMAIN.to_string(),
            clean_dir: self.clean_cache,
        }
    }
}

fn parse_opt<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    match get(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                name: name.to_string(),
                value,
            }),
        None => Ok(None),
    }
}
