use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use anon_match::config::{Settings, StoreBackend};
use anon_match::core::{Matcher, PairingHooks};
use anon_match::games::GameRegistry;
use anon_match::routes::{self, AppState};
use anon_match::services::{
    CacheManager, GeocodingClient, MemoryStore, PostgresStore, ProfileService, ProfileStore,
    ReverseGeocoder,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle malformed path parameters such as a non-numeric user id
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

async fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn ProfileStore>> {
    match settings.database.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let db = &settings.database;
            let url = db
                .url
                .as_deref()
                .ok_or_else(|| startup_error("PostgreSQL backend", "no database url"))?;

            let store = PostgresStore::from_settings(
                url,
                db.max_connections,
                db.min_connections,
                db.acquire_timeout_secs,
                db.idle_timeout_secs,
            )
            .await
            .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;

            info!(
                "PostgreSQL store initialized (max: {} connections)",
                db.max_connections.unwrap_or(10)
            );
            Ok(Arc::new(store))
        }
    }
}

async fn build_geocoder(settings: &Settings) -> std::io::Result<Option<Arc<dyn ReverseGeocoder>>> {
    let geocoding = &settings.geocoding;
    if !geocoding.enabled {
        info!("Reverse geocoding disabled, coordinates resolve to Unknown");
        return Ok(None);
    }

    let cache_ttl = settings.cache.ttl_secs.unwrap_or(86_400);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(10_000);

    // Redis is optional - fall back to the in-process cache
    let cache = match CacheManager::new(settings.cache.redis_url.as_deref(), l1_cache_size, cache_ttl).await {
        Ok(c) => {
            info!("Geocoding cache initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
            c
        }
        Err(e) => {
            warn!("Failed to connect to Redis ({}), caching geocoding results in memory only", e);
            CacheManager::in_memory(l1_cache_size, cache_ttl)
        }
    };

    let client = GeocodingClient::new(
        geocoding.endpoint.clone(),
        geocoding.user_agent.clone(),
        Duration::from_secs(geocoding.timeout_secs),
    )
    .map_err(|e| startup_error("Failed to build geocoding client", e))?
    .with_cache(Arc::new(cache));

    info!("Reverse geocoding via {}", geocoding.endpoint);
    Ok(Some(Arc::new(client)))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration; logging settings are needed before the subscriber exists
    let settings = Settings::load().and_then(|s| s.validate().map(|_| s));

    let logging = settings
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default()
        .with_overrides(std::env::var("LOG_LEVEL").ok(), std::env::var("LOG_FORMAT").ok());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level)),
        )
        .with_target(false)
        .with_level(true);

    if logging.is_pretty() {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    info!("Starting Anon Match service...");

    let settings = settings.map_err(|e| startup_error("Configuration error", e))?;

    info!("Configuration loaded successfully");

    let store = build_store(&settings).await?;
    let geocoder = build_geocoder(&settings).await?;

    let profiles = ProfileService::new(
        store.clone(),
        geocoder,
        settings.matching.default_preferences(),
    );

    // Games discard a session's quiz when its pairing ends
    let games = Arc::new(GameRegistry::new(settings.games.answer_cooldown_secs));
    let hooks = PairingHooks::new().with_listener(games.clone());

    let matcher = Matcher::new(store.clone(), hooks, settings.matching.matcher_settings());

    info!(
        "Matcher initialized (mutual preferences: {}, commit retries: {})",
        settings.matching.mutual_preferences, settings.matching.max_commit_retries
    );

    // Build application state
    let app_state = AppState {
        store,
        profiles,
        matcher,
        games,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
