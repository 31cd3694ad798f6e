//! Gismeteo client: location, update cycle and the accessor surface.
//!
//! An update is split in two halves so a scheduler can hold a shared lock
//! while waiting on the network:
//! - [`GismeteoClient::fetch_update`] does all I/O and parsing and returns a
//!   [`Snapshot`] without touching the client.
//! - [`GismeteoClient::apply`] swaps the snapshot in with plain assignments.
//!
//! A failed fetch leaves the previously applied data in place.

use chrono::Utc;
use reqwest::header::HeaderMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{ApiError, InvalidCoordinatesError};
use crate::models::{Condition, ForecastMode, LocationAttributes, WeatherRecord};
use crate::services::auxiliary::{
    fetch_auxiliary, merge_auxiliary, AuxiliaryData, AuxiliaryThrottle, PARSER_BASE_URL,
};
use crate::services::cache::{FileCache, ResponseCache};
use crate::services::fetcher::Fetcher;
use crate::services::forecast::{parse_forecast, ParsedForecast};
use crate::services::location::{self, validate_coordinates};
use crate::services::metrics;
use crate::services::window::{self, DisplayTimezone, ForecastEntry};

/// Provider API endpoint.
pub const ENDPOINT_URL: &str = "https://services.gismeteo.ru/inform-service/inf_chrome";

/// Default freshness for cached forecast documents (3 hours).
pub const DEFAULT_CACHE_TIME_SECS: u64 = 3 * 3600;

/// Default cache file prefix.
pub const DEFAULT_DOMAIN: &str = "gismeteo";

/// Optional client settings.
#[derive(Debug, Clone)]
pub struct ClientParams {
    /// IANA timezone for display timestamps; provider offset when unset
    pub timezone: Option<String>,
    /// Cache directory; no caching when unset
    pub cache_dir: Option<PathBuf>,
    /// Default cache max-age
    pub cache_time: Duration,
    /// Cache file prefix
    pub domain: String,
    /// Purge stale cache files on construction
    pub clean_dir: bool,
}

impl Default for ClientParams {
    fn default() -> Self {
        Self {
            timezone: None,
            cache_dir: None,
            cache_time: Duration::from_secs(DEFAULT_CACHE_TIME_SECS),
            domain: DEFAULT_DOMAIN.to_string(),
            clean_dir: false,
        }
    }
}

/// Result of one fetch, ready to be applied.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Set when the location had to be resolved during this fetch
    pub location: Option<LocationAttributes>,
    pub forecast: ParsedForecast,
    /// Set when the 10-day page was fetched during this fetch
    pub auxiliary: Option<AuxiliaryData>,
    /// Epoch seconds the fetch started at
    pub fetched_at: i64,
}

#[derive(Debug)]
pub struct GismeteoClient {
    fetcher: Fetcher,
    endpoint_url: String,
    parser_base_url: String,
    mode: ForecastMode,
    location: LocationAttributes,
    timezone: Option<DisplayTimezone>,
    tzone: Option<i64>,
    current: WeatherRecord,
    forecast: Vec<WeatherRecord>,
    auxiliary: AuxiliaryData,
    throttle: AuxiliaryThrottle,
    last_updated: Option<i64>,
}

impl GismeteoClient {
    /// Create a client for a coordinate pair, or for an explicit provider
    /// location id which then takes precedence over the coordinates.
    pub fn new(
        http: reqwest::Client,
        latitude: f64,
        longitude: f64,
        location_id: Option<i64>,
        mode: ForecastMode,
        params: ClientParams,
    ) -> Result<Self, InvalidCoordinatesError> {
        validate_coordinates(latitude, longitude)?;

        let cache = params.cache_dir.as_ref().map(|dir| {
            let cache = FileCache::new(dir, params.cache_time, Some(&params.domain));
            if params.clean_dir {
                let removed = cache.purge(None);
                tracing::debug!("Removed {} stale cache files", removed);
            }
            Arc::new(cache) as Arc<dyn ResponseCache>
        });

        let timezone = params
            .timezone
            .as_deref()
            .and_then(DisplayTimezone::from_name);

        tracing::debug!(
            "Gismeteo client for {}, {} (location id {:?}), {} forecast",
            latitude,
            longitude,
            location_id,
            mode
        );

        Ok(Self {
            fetcher: Fetcher::new(http, cache),
            endpoint_url: ENDPOINT_URL.to_string(),
            parser_base_url: PARSER_BASE_URL.to_string(),
            mode,
            location: LocationAttributes {
                id: location_id,
                name: None,
                latitude,
                longitude,
            },
            timezone,
            tzone: None,
            current: WeatherRecord::default(),
            forecast: Vec::new(),
            auxiliary: AuxiliaryData::new(),
            throttle: AuxiliaryThrottle::default(),
            last_updated: None,
        })
    }

    /// Point the client at other provider hosts.
    pub fn with_endpoints(mut self, endpoint_url: &str, parser_base_url: &str) -> Self {
        self.endpoint_url = endpoint_url.trim_end_matches('/').to_string();
        self.parser_base_url = parser_base_url.trim_end_matches('/').to_string();
        self
    }

    /// Replace the response cache.
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.fetcher = Fetcher::new(self.fetcher.client().clone(), Some(cache));
        self
    }

    // -----------------------------------------------------------------------
    // Update cycle
    // -----------------------------------------------------------------------

    /// Fetch and parse everything for one update, without mutating `self`.
    pub async fn fetch_update(&self, now: i64) -> Result<Snapshot, ApiError> {
        let resolved = match self.location.id {
            Some(_) => None,
            None => Some(
                location::resolve(
                    &self.fetcher,
                    &self.endpoint_url,
                    self.location.latitude,
                    self.location.longitude,
                )
                .await?,
            ),
        };
        let location_id = resolved
            .as_ref()
            .and_then(|l| l.id)
            .or(self.location.id)
            .ok_or_else(|| ApiError::InvalidResponse("no location id".to_string()))?;

        let url = format!(
            "{}/forecast/?city={}&lang=en",
            self.endpoint_url, location_id
        );
        let cache_key = format!("forecast_{}.xml", location_id);
        let xml = self
            .fetcher
            .fetch(&url, Some(&cache_key), None, HeaderMap::new())
            .await?;
        let mut forecast = parse_forecast(&xml, self.mode)?;

        let auxiliary = if self.throttle.is_due(now) {
            match (forecast.nowcast_url.as_deref(), forecast.today()) {
                (Some(nowcast_url), Some(today)) => {
                    fetch_auxiliary(
                        &self.fetcher,
                        &self.parser_base_url,
                        nowcast_url,
                        location_id,
                        today,
                    )
                    .await
                }
                _ => {
                    tracing::debug!("Forecast document has no nowcast link or current time");
                    None
                }
            }
        } else {
            None
        };

        merge_auxiliary(
            &mut forecast.forecast,
            auxiliary.as_ref().unwrap_or(&self.auxiliary),
            forecast.tzone,
        );

        Ok(Snapshot {
            location: resolved,
            forecast,
            auxiliary,
            fetched_at: now,
        })
    }

    /// Swap in a fetched snapshot.
    pub fn apply(&mut self, snapshot: Snapshot) {
        if let Some(location) = snapshot.location {
            self.location = location;
        }
        if let Some(auxiliary) = snapshot.auxiliary {
            self.auxiliary = auxiliary;
            self.throttle.record_success(snapshot.fetched_at);
        }
        self.tzone = Some(snapshot.forecast.tzone);
        self.current = snapshot.forecast.current;
        self.forecast = snapshot.forecast.forecast;
        self.last_updated = Some(snapshot.fetched_at);
    }

    /// Fetch and apply in one go.
    pub async fn update(&mut self) -> Result<bool, ApiError> {
        let snapshot = self.fetch_update(Utc::now().timestamp()).await?;
        self.apply(snapshot);
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn attributes(&self) -> &LocationAttributes {
        &self.location
    }

    pub fn mode(&self) -> ForecastMode {
        self.mode
    }

    /// Epoch seconds of the last applied update.
    pub fn last_updated(&self) -> Option<i64> {
        self.last_updated
    }

    pub fn has_data(&self) -> bool {
        self.last_updated.is_some()
    }

    /// Weather entity id, e.g. `167413-hourly`.
    pub fn unique_id(&self) -> Option<String> {
        self.location.id.map(|id| format!("{}-{}", id, self.mode))
    }

    /// Configured timezone, else the provider's offset once known.
    pub fn display_timezone(&self) -> Option<DisplayTimezone> {
        self.timezone
            .or_else(|| self.tzone.and_then(DisplayTimezone::from_offset_minutes))
    }

    pub fn current_data(&self) -> &WeatherRecord {
        &self.current
    }

    /// Record at `index` in the now-relative forecast window.
    pub fn forecast_data(&self, index: usize) -> Option<&WeatherRecord> {
        self.forecast_data_at(index, Utc::now().timestamp())
    }

    pub fn forecast_data_at(&self, index: usize, now: i64) -> Option<&WeatherRecord> {
        window::forecast_data(&self.forecast, index, now)
    }

    pub fn condition(&self) -> Option<Condition> {
        metrics::condition(&self.current, self.mode, Utc::now().timestamp())
    }

    pub fn temperature(&self) -> Option<f64> {
        metrics::temperature(&self.current)
    }

    pub fn temperature_feels_like(&self) -> Option<f64> {
        metrics::temperature_feels_like(&self.current)
    }

    pub fn water_temperature(&self) -> Option<f64> {
        metrics::water_temperature(&self.current)
    }

    pub fn pressure_mmhg(&self) -> Option<f64> {
        metrics::pressure_mmhg(&self.current)
    }

    pub fn pressure_hpa(&self) -> Option<f64> {
        metrics::pressure_hpa(&self.current)
    }

    pub fn humidity(&self) -> Option<i64> {
        metrics::humidity(&self.current)
    }

    pub fn wind_bearing(&self) -> Option<i64> {
        metrics::wind_bearing(&self.current)
    }

    pub fn wind_speed_kmh(&self) -> Option<f64> {
        metrics::wind_speed_kmh(&self.current)
    }

    pub fn wind_speed_ms(&self) -> Option<f64> {
        metrics::wind_speed_ms(&self.current)
    }

    pub fn precipitation_amount(&self) -> Option<f64> {
        metrics::precipitation_amount(&self.current)
    }

    pub fn clouds(&self) -> Option<i64> {
        metrics::clouds(&self.current)
    }

    pub fn rain(&self) -> Option<f64> {
        metrics::rain(&self.current)
    }

    pub fn snow(&self) -> Option<f64> {
        metrics::snow(&self.current)
    }

    pub fn storm(&self) -> Option<bool> {
        metrics::storm(&self.current)
    }

    pub fn geomagnetic(&self) -> Option<i64> {
        metrics::geomagnetic(&self.current)
    }

    /// Birch allergy index for the current forecast slot.
    pub fn allergy_birch(&self) -> Option<i64> {
        self.forecast_data(0).and_then(metrics::allergy_birch)
    }

    /// UV index for the current forecast slot.
    pub fn uv_index(&self) -> Option<i64> {
        self.forecast_data(0).and_then(metrics::uv_index)
    }

    /// Display forecast from now on.
    pub fn forecast(&self) -> Vec<ForecastEntry> {
        self.forecast_at(Utc::now().timestamp())
    }

    pub fn forecast_at(&self, now: i64) -> Vec<ForecastEntry> {
        let Some(timezone) = self.display_timezone() else {
            return Vec::new();
        };
        window::build_forecast(&self.forecast, self.mode, &timezone, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cache::MemoryCache;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOCATION_XML: &str = include_str!("../../fixtures/location.xml");
    const FORECAST_XML: &str = include_str!("../../fixtures/forecast.xml");
    const PARSED_HTML: &str = include_str!("../../fixtures/parsed.html");

    const LATITUDE: f64 = 55.5917;
    const LONGITUDE: f64 = 37.7408;

    fn client(server: &MockServer, location_id: Option<i64>, mode: ForecastMode) -> GismeteoClient {
        GismeteoClient::new(
            reqwest::Client::new(),
            LATITUDE,
            LONGITUDE,
            location_id,
            mode,
            ClientParams::default(),
        )
        .unwrap()
        .with_endpoints(&server.uri(), &server.uri())
    }

    async fn mount_provider(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/cities/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOCATION_XML))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast/"))
            .and(query_param("city", "167413"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_XML))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/weather-razvilka-167413/10-days/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PARSED_HTML))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        for (lat, lon) in [(90.1, 0.0), (0.0, -180.1), (f64::NAN, 0.0)] {
            let result = GismeteoClient::new(
                reqwest::Client::new(),
                lat,
                lon,
                None,
                ForecastMode::Hourly,
                ClientParams::default(),
            );
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_empty_client_state() {
        let client = GismeteoClient::new(
            reqwest::Client::new(),
            LATITUDE,
            LONGITUDE,
            None,
            ForecastMode::Daily,
            ClientParams::default(),
        )
        .unwrap();

        assert!(!client.has_data());
        assert_eq!(client.unique_id(), None);
        assert_eq!(client.condition(), None);
        assert_eq!(client.temperature(), None);
        assert!(client.forecast().is_empty());
        assert_eq!(client.display_timezone(), None);
    }

    #[tokio::test]
    async fn test_update_resolves_location_and_parses() {
        let server = MockServer::start().await;
        mount_provider(&server).await;

        let mut client = client(&server, None, ForecastMode::Hourly);
        assert!(client.update().await.unwrap());

        let attributes = client.attributes();
        assert_eq!(attributes.id, Some(167413));
        assert_eq!(attributes.name.as_deref(), Some("Razvilka"));
        assert_eq!(client.unique_id().as_deref(), Some("167413-hourly"));

        assert_eq!(client.temperature(), Some(-7.0));
        assert_eq!(client.temperature_feels_like(), Some(-12.3));
        assert_eq!(client.water_temperature(), Some(3.0));
        assert_eq!(client.pressure_mmhg(), Some(746.0));
        assert_eq!(client.pressure_hpa(), Some(994.6));
        assert_eq!(client.humidity(), Some(86));
        assert_eq!(client.wind_bearing(), Some(180));
        assert_eq!(client.wind_speed_kmh(), Some(10.8));
        assert_eq!(client.wind_speed_ms(), Some(3.0));
        assert_eq!(client.precipitation_amount(), Some(0.3));
        assert_eq!(client.clouds(), Some(100));
        assert_eq!(client.rain(), Some(0.0));
        assert_eq!(client.snow(), Some(0.3));
        assert_eq!(client.storm(), Some(false));
        assert_eq!(client.geomagnetic(), Some(3));
        assert_eq!(client.condition(), Some(Condition::Snowy));
        assert!(client.has_data());
    }

    #[tokio::test]
    async fn test_update_merges_auxiliary_and_throttles_it() {
        let server = MockServer::start().await;
        mount_provider(&server).await;

        let mut client = client(&server, Some(167413), ForecastMode::Hourly);
        client.update().await.unwrap();
        client.update().await.unwrap();

        // 2021-02-22 05:00 local
        let now = 1613959200;
        let slot = client.forecast_data_at(0, now).unwrap();
        assert_eq!(slot.allergy_birch, Some(2));
        assert_eq!(slot.uv_index, Some(3));
        // `.expect(1)` on the 10-day page is verified when the server drops
    }

    #[tokio::test]
    async fn test_explicit_location_skips_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cities/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOCATION_XML))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast/"))
            .and(query_param("city", "3546"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_XML))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client(&server, Some(3546), ForecastMode::Daily);
        client.update().await.unwrap();

        assert_eq!(client.attributes().id, Some(3546));
        assert_eq!(client.unique_id().as_deref(), Some("3546-daily"));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_XML))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut client = client(&server, Some(167413), ForecastMode::Hourly);
        client.update().await.unwrap();
        let updated_at = client.last_updated();

        let result = client.update().await;

        assert_eq!(result, Err(ApiError::Status(500)));
        assert_eq!(client.temperature(), Some(-7.0));
        assert_eq!(client.last_updated(), updated_at);
    }

    #[tokio::test]
    async fn test_bad_timezone_offset_keeps_previous_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_XML))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(FORECAST_XML.replace(r#"tzone="180""#, r#"tzone="100000""#)),
            )
            .mount(&server)
            .await;

        let mut client = client(&server, Some(167413), ForecastMode::Hourly);
        client.update().await.unwrap();
        let updated_at = client.last_updated();
        let first_slot = client.forecast_data_at(0, 0).cloned();

        let result = client.update().await;

        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
        assert_eq!(client.last_updated(), updated_at);
        assert!(first_slot.is_some());
        assert_eq!(client.forecast_data_at(0, 0).cloned(), first_slot);
    }

    #[tokio::test]
    async fn test_invalid_document_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let mut client = client(&server, Some(167413), ForecastMode::Hourly);
        let result = client.update().await;

        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
        assert!(!client.has_data());
    }

    #[tokio::test]
    async fn test_fetch_update_does_not_mutate() {
        let server = MockServer::start().await;
        mount_provider(&server).await;

        let client = client(&server, None, ForecastMode::Daily);
        let snapshot = client.fetch_update(Utc::now().timestamp()).await.unwrap();

        assert!(snapshot.location.is_some());
        assert!(snapshot.auxiliary.is_some());
        assert_eq!(snapshot.forecast.forecast.len(), 2);
        assert_eq!(client.attributes().id, None);
        assert!(!client.has_data());
    }

    #[tokio::test]
    async fn test_forecast_uses_provider_offset() {
        let server = MockServer::start().await;
        mount_provider(&server).await;

        let mut client = client(&server, Some(167413), ForecastMode::Daily);
        client.update().await.unwrap();

        let forecast = client.forecast_at(1613952000);
        assert_eq!(forecast.len(), 1);
        assert_eq!(forecast[0].datetime, "2021-02-22T00:00:00+03:00");
        assert_eq!(forecast[0].templow, Some(2.0));
    }

    #[tokio::test]
    async fn test_cached_forecast_served_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_XML))
            .expect(0)
            .mount(&server)
            .await;

        let cache = Arc::new(MemoryCache::new(Duration::from_secs(3600)));
        cache.write("forecast_167413.xml", FORECAST_XML);
        cache.write("forecast_parsed_167413.html", PARSED_HTML);

        let mut client = client(&server, Some(167413), ForecastMode::Hourly)
            .with_cache(cache as Arc<dyn ResponseCache>);
        client.update().await.unwrap();

        assert_eq!(client.humidity(), Some(86));
    }

    #[test]
    fn test_clean_dir_purges_stale_files() {
        let tmp = TempDir::new().unwrap();
        let stale = tmp.path().join("gismeteo.forecast_1.xml");
        std::fs::write(&stale, "x").unwrap();
        let file = std::fs::File::options().write(true).open(&stale).unwrap();
        file.set_modified(std::time::SystemTime::now() - Duration::from_secs(7200))
            .unwrap();
        drop(file);

        let params = ClientParams {
            cache_dir: Some(tmp.path().to_path_buf()),
            cache_time: Duration::from_secs(3600),
            clean_dir: true,
            ..ClientParams::default()
        };
        GismeteoClient::new(
            reqwest::Client::new(),
            LATITUDE,
            LONGITUDE,
            None,
            ForecastMode::Hourly,
            params,
        )
        .unwrap();

        assert!(!stale.exists());
    }

    #[test]
    fn test_configured_timezone_wins() {
        let params = ClientParams {
            timezone: Some("UTC".to_string()),
            ..ClientParams::default()
        };
        let mut client = GismeteoClient::new(
            reqwest::Client::new(),
            LATITUDE,
            LONGITUDE,
            Some(167413),
            ForecastMode::Daily,
            params,
        )
        .unwrap();
        client.apply(Snapshot {
            forecast: parse_forecast(FORECAST_XML, ForecastMode::Daily).unwrap(),
            fetched_at: 1613952000,
            ..Snapshot::default()
        });

        let forecast = client.forecast_at(1613952000);
        assert_eq!(forecast[0].datetime, "2021-02-21T21:00:00+00:00");
    }
}
