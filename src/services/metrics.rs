use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

use crate::models::PlaylistStats;

lazy_static! {
    pub static ref PLAYLISTS_PARSED: IntCounterVec = register_int_counter_vec!(
        "kino_playlists_parsed_total",
        "Playlists parsed, by source (remote or text)",
        &["source"]
    )
    .unwrap();
    pub static ref ENTRIES_PARSED: IntCounter = register_int_counter!(
        "kino_playlist_entries_total",
        "Playlist entries emitted by the parser"
    )
    .unwrap();
    pub static ref DIRECTIVES_DROPPED: IntCounter = register_int_counter!(
        "kino_playlist_dropped_directives_total",
        "Directives discarded because no URL followed them"
    )
    .unwrap();
    pub static ref PARSE_FAILURES: IntCounter = register_int_counter!(
        "kino_playlist_failures_total",
        "Playlists that could not be fetched or decoded"
    )
    .unwrap();
    pub static ref PARSE_CACHE_HITS: IntCounter = register_int_counter!(
        "kino_parse_cache_hits_total",
        "Parse requests served from the parse cache"
    )
    .unwrap();
}

/// Record one completed parse
pub fn record_parse(source: &str, stats: &PlaylistStats) {
    PLAYLISTS_PARSED.with_label_values(&[source]).inc();
    ENTRIES_PARSED.inc_by(stats.entries as u64);
    DIRECTIVES_DROPPED.inc_by(stats.dropped_directives as u64);
}
