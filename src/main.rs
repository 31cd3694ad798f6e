// Gismeteo Weather API v0.1
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use gismeteo_weather::config::AppConfig;
use gismeteo_weather::routes::{self, AppState};
use gismeteo_weather::services::client::GismeteoClient;
use gismeteo_weather::services::coordinator::{self, CoordinatorState, SharedCoordinatorState};
use gismeteo_weather::services::fetcher::Fetcher;
use gismeteo_weather::{errors, models, services};

/// Gismeteo Weather API OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gismeteo Weather API",
        version = "0.1.0",
        description = "Current conditions, forecast and per-metric sensors for one \
            location, polled from Gismeteo and normalized into derived weather values \
            (condition, feels-like temperature, wind, precipitation, allergy and UV index).",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Weather", description = "Current conditions and forecast"),
        (name = "Sensors", description = "Per-metric sensor states"),
        (name = "Coordinator", description = "Background update status"),
    ),
    paths(
        routes::health::health_check,
        routes::weather::get_current_weather,
        routes::weather::get_forecast,
        routes::sensors::list_sensors,
        routes::sensors::get_sensor,
        routes::coordinator::get_coordinator_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::weather::CurrentWeatherResponse,
            routes::weather::ForecastResponse,
            routes::sensors::SensorResponse,
            services::window::ForecastEntry,
            services::sensors::SensorKind,
            services::coordinator::CoordinatorState,
            models::LocationAttributes,
            models::ForecastMode,
            models::Condition,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gismeteo_weather=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let http = match Fetcher::default_client() {
        Ok(http) => http,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let client = match GismeteoClient::new(
        http,
        config.latitude,
        config.longitude,
        config.location_id,
        config.mode,
        config.client_params(),
    ) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Tracking weather for {}, {} ({} forecast)",
        config.latitude,
        config.longitude,
        config.mode
    );

    // Shared client and coordinator state; the coordinator is the only writer
    let client = Arc::new(RwLock::new(client));
    let coordinator_state: SharedCoordinatorState = Arc::new(RwLock::new(CoordinatorState::new()));
    tokio::spawn(coordinator::run_coordinator(
        client.clone(),
        coordinator_state.clone(),
        config.update_interval_secs,
    ));

    let app_state = AppState {
        client,
        coordinator: coordinator_state,
    };

    // CORS: read-only API, restrict methods to GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/weather", get(routes::weather::get_current_weather))
        .route(
            "/api/v1/weather/forecast",
            get(routes::weather::get_forecast),
        )
        .route("/api/v1/sensors", get(routes::sensors::list_sensors))
        .route("/api/v1/sensors/:kind", get(routes::sensors::get_sensor))
        .route(
            "/api/v1/coordinator/status",
            get(routes::coordinator::get_coordinator_status),
        )
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind TCP listener on {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server terminated unexpectedly: {}", e);
    }
}
