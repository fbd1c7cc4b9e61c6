pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::FetchError;
use crate::services::{M3uParser, ParseCache, PlaylistFetcher};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub parser: M3uParser,
    pub fetcher: PlaylistFetcher,
    pub cache: ParseCache,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, FetchError> {
        let parser = M3uParser::new(config.parser_options(), config.link_normalizer());
        let fetcher = PlaylistFetcher::new(
            &config.user_agent,
            config.fetch_timeout_ms,
            config.max_retries,
            config.max_m3u_size_mb,
        )?;
        let ttl = (config.parse_cache_ttl_ms > 0)
            .then(|| Duration::from_millis(config.parse_cache_ttl_ms));
        let cache = ParseCache::new(config.parse_cache_max_entries, ttl);

        Ok(Self {
            config,
            parser,
            fetcher,
            cache,
            start_time: Instant::now(),
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoints
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/live", get(routes::health::live))
        // Playlist endpoints
        .route("/api/playlist/parse", post(routes::playlist::parse_playlist))
        .route("/api/playlist/parse-text", post(routes::playlist::parse_text))
        .route(
            "/api/playlist/:hash/groups",
            get(routes::playlist::get_groups),
        )
        .route(
            "/api/playlist/:hash/items",
            get(routes::playlist::get_items),
        )
        .route(
            "/api/playlist/:hash/series",
            get(routes::playlist::get_series),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
