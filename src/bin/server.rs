use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use kissbot_game_lookup::{logging, LookupConfig, LookupError, LookupResponse, LookupService};

#[derive(Clone)]
struct AppState {
    service: Arc<LookupService>,
}

#[derive(Debug, Deserialize)]
struct LookupParams {
    key: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    api_enabled: bool,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    cache: CacheStatsDto,
}

#[derive(Debug, Serialize)]
struct CacheStatsDto {
    total_entries: u64,
    total_hits: u64,
    total_misses: u64,
    hit_ratio: f64,
    oldest_entry: Option<String>,
    newest_entry: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClearResponse {
    cleared: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing("game_lookup_server=debug,kissbot_game_lookup=debug");

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.txt".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8090);

    tracing::info!("🚀 Starting KissBot Game Lookup Server");
    tracing::info!("📦 Config: {}", config_path);
    tracing::info!("🔌 Port: {}", port);

    let mut config = match LookupConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("⚠️ Could not read {} ({}), using defaults", config_path, e);
            LookupConfig::default()
        }
    };
    if let Ok(key) = std::env::var("STEAM_API_KEY") {
        if !key.trim().is_empty() {
            config = config.with_api_key(key.trim());
        }
    }
    tracing::info!("⚙️ {}", config);

    let service = LookupService::from_config(config).await?;
    let state = AppState {
        service: Arc::new(service),
    };

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/lookup", get(lookup_handler))
        .route("/v1/stats", get(stats_handler))
        .route("/v1/cache/clear", post(clear_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("🎮 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: kissbot_game_lookup::VERSION.to_string(),
        api_enabled: state.service.has_api(),
    })
}

async fn lookup_handler(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> Result<Json<LookupResponse>, AppError> {
    tracing::debug!("Lookup request: {:?}", params);

    let response = state.service.lookup_detailed(&params.key).await?;

    tracing::info!("✅ {} → {}", params.key, response.display());

    Ok(Json(response))
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.service.cache_stats();

    Json(StatsResponse {
        cache: CacheStatsDto {
            total_entries: stats.total_entries,
            total_hits: stats.total_hits,
            total_misses: stats.total_misses,
            hit_ratio: stats.hit_ratio(),
            oldest_entry: stats.oldest_entry.map(|t| t.to_rfc3339()),
            newest_entry: stats.newest_entry.map(|t| t.to_rfc3339()),
        },
    })
}

async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.service.cache().len();
    state.service.clear_cache();
    Json(ClearResponse { cleared })
}

// Error handling
struct AppError(LookupError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LookupError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LookupError::NotFound(_) => StatusCode::NOT_FOUND,
            LookupError::Auth(_) | LookupError::Parsing(_) => StatusCode::BAD_GATEWAY,
            e if e.is_network() => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = self.0.to_string();

        tracing::error!("❌ Error: {} - {}", status, message);

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<LookupError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
