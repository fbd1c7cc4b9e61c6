use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::{FetchError, ParseError};
use crate::models::{
    GroupSummary, GroupsResponse, ItemsQuery, ItemsResponse, ParseOptions, ParseRequest,
    ParseResponse, PlaylistEntry, SeriesEpisode, SeriesQuery, SeriesResponse, SeriesSummary,
};
use crate::services::heuristics::{cluster_by_series, parse_season_episode};
use crate::services::metrics;
use crate::services::{hash_url, CachedPlaylist, ParsedPlaylist};
use crate::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

/// Cache key for a source; a deduplicated parse is cached separately
fn cache_key(source: &str, options: ParseOptions) -> String {
    if options.remove_duplicates {
        hash_url(&format!("{}#removeDuplicates", source))
    } else {
        hash_url(source)
    }
}

fn fetch_error_status(err: &FetchError) -> StatusCode {
    match err {
        FetchError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        FetchError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        FetchError::Network(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn is_http_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

fn parse_response(hash: String, playlist: &CachedPlaylist, cached: bool) -> ParseResponse {
    ParseResponse {
        hash,
        cached,
        parsed_at: playlist.parsed_at,
        stats: playlist.parsed.stats.clone(),
        groups: GroupSummary::from_map(&playlist.parsed.groups),
    }
}

fn lookup(state: &AppState, hash: &str) -> Result<Arc<CachedPlaylist>, ApiError> {
    state
        .cache
        .get(&hash.to_string())
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Playlist not found or expired"))
}

/// Entries of one group, matched exactly first and then by folded name
fn select_entries<'a>(
    playlist: &'a CachedPlaylist,
    group: Option<&str>,
) -> Result<Vec<&'a PlaylistEntry>, ApiError> {
    let groups = &playlist.parsed.groups;

    match group {
        None => Ok(groups.flatten().collect()),
        Some(name) => {
            let entries = match groups.get(name) {
                Some(entries) => entries,
                None => groups
                    .find_group(name)
                    .map(|g| g.entries.as_slice())
                    .ok_or_else(|| {
                        api_error(StatusCode::NOT_FOUND, format!("Group not found: {}", name))
                    })?,
            };
            Ok(entries.iter().collect())
        }
    }
}

fn store(state: &AppState, hash: &str, parsed: ParsedPlaylist) -> Arc<CachedPlaylist> {
    let playlist = Arc::new(CachedPlaylist {
        parsed,
        parsed_at: chrono::Utc::now().timestamp_millis(),
    });
    state.cache.insert(hash.to_string(), playlist.clone());
    playlist
}

/// POST /api/playlist/parse - Fetch and parse a playlist URL
pub async fn parse_playlist(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ParseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let url = payload.url.trim();

    // Validate URL
    if !is_http_url(url) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid playlist URL"));
    }

    let hash = cache_key(url, payload.options);

    if let Some(playlist) = state.cache.get(&hash) {
        tracing::info!("Cache hit for {} ({} entries)", hash, playlist.parsed.stats.entries);
        metrics::PARSE_CACHE_HITS.inc();
        return Ok(Json(parse_response(hash, &playlist, true)));
    }

    let bytes = state.fetcher.fetch(url).await.map_err(|e| {
        metrics::PARSE_FAILURES.inc();
        tracing::error!("Failed to fetch playlist {}: {}", hash, e);
        api_error(fetch_error_status(&e), e.to_string())
    })?;

    // Large playlists take a while; keep the parse off the async workers
    let parser = state.parser.with_request_options(payload.options);
    let parsed = tokio::task::spawn_blocking(move || parser.parse_bytes(&bytes))
        .await
        .map_err(|e| {
            tracing::error!("Parse task failed for {}: {}", hash, e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to parse playlist")
        })?
        .map_err(|e: ParseError| {
            metrics::PARSE_FAILURES.inc();
            tracing::warn!("Rejected playlist {}: {}", hash, e);
            api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        })?;

    metrics::record_parse("remote", &parsed.stats);
    tracing::info!(
        "Parsed {}: {} entries, {} groups",
        hash,
        parsed.stats.entries,
        parsed.stats.groups
    );

    let playlist = store(&state, &hash, parsed);
    Ok(Json(parse_response(hash, &playlist, false)))
}

/// POST /api/playlist/parse-text - Parse playlist text posted as the body
pub async fn parse_text(
    State(state): State<Arc<AppState>>,
    Query(options): Query<ParseOptions>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let text = String::from_utf8(body.to_vec()).map_err(|e| {
        metrics::PARSE_FAILURES.inc();
        api_error(
            StatusCode::BAD_REQUEST,
            ParseError::from(e.utf8_error()).to_string(),
        )
    })?;

    let hash = cache_key(&text, options);

    if let Some(playlist) = state.cache.get(&hash) {
        metrics::PARSE_CACHE_HITS.inc();
        return Ok(Json(parse_response(hash, &playlist, true)));
    }

    let parser = state.parser.with_request_options(options);
    let parsed = tokio::task::spawn_blocking(move || parser.parse_playlist(&text))
        .await
        .map_err(|e| {
            tracing::error!("Parse task failed for {}: {}", hash, e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to parse playlist")
        })?;

    metrics::record_parse("text", &parsed.stats);

    let playlist = store(&state, &hash, parsed);
    Ok(Json(parse_response(hash, &playlist, false)))
}

/// GET /api/playlist/:hash/groups - Get all groups
pub async fn get_groups(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist = lookup(&state, &hash)?;
    let groups = GroupSummary::from_map(&playlist.parsed.groups);

    Ok(Json(GroupsResponse {
        total: groups.len(),
        groups,
    }))
}

/// GET /api/playlist/:hash/items - Get paginated items
pub async fn get_items(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
    Query(query): Query<ItemsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist = lookup(&state, &hash)?;
    let entries = select_entries(&playlist, query.group.as_deref())?;

    // Apply limits
    let limit = query.limit.min(state.config.max_items_page);
    let offset = query.offset;
    let total = entries.len();

    let items: Vec<PlaylistEntry> = entries
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    let has_more = offset + items.len() < total;

    Ok(Json(ItemsResponse {
        items,
        total,
        limit,
        offset,
        has_more,
    }))
}

/// GET /api/playlist/:hash/series - Series clusters with season/episode numbers
pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist = lookup(&state, &hash)?;
    let entries = select_entries(&playlist, query.group.as_deref())?;

    let series: Vec<SeriesSummary> = cluster_by_series(entries)
        .into_vec()
        .into_iter()
        .map(|cluster| {
            let logo = cluster.entries.iter().find_map(|e| e.logo_url.clone());
            let episodes: Vec<SeriesEpisode> = cluster
                .entries
                .into_iter()
                .map(|entry| SeriesEpisode {
                    numbers: parse_season_episode(&entry.title),
                    entry,
                })
                .collect();

            SeriesSummary {
                key: cluster.key,
                name: cluster.display_name,
                episode_count: episodes.len(),
                logo,
                episodes,
            }
        })
        .collect();

    Ok(Json(SeriesResponse {
        total: series.len(),
        series,
    }))
}
