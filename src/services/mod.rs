//! Playlist services
//!
//! Pure text processing (normalizer, attributes, parser, heuristics, links)
//! plus the pieces the HTTP layer needs around it (fetcher, cache, metrics).

pub mod attributes;
pub mod cache;
pub mod fetcher;
pub mod heuristics;
pub mod links;
pub mod m3u_parser;
pub mod metrics;
pub mod normalizer;

// Re-export commonly used items
pub use cache::{CachedPlaylist, EnrichmentCache, EnrichmentKey, ParseCache, TtlCache};
pub use fetcher::PlaylistFetcher;
pub use links::LinkNormalizer;
pub use m3u_parser::{hash_url, M3uParser, ParsedPlaylist, ParserOptions};
