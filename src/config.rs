use std::env;
use std::str::FromStr;

use crate::services::links::{
    LinkNormalizer, StreamProxy, DEFAULT_MANIFEST_HOST_MARKER, DEFAULT_REDIRECTOR_TEMPLATE,
};
use crate::services::m3u_parser::{ParserOptions, DEFAULT_FALLBACK_GROUP, DEFAULT_FALLBACK_TITLE};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub app_env: String,

    // Fetching
    pub user_agent: String,
    pub fetch_timeout_ms: u64,
    pub max_retries: u32,
    pub max_m3u_size_mb: usize,

    // Parse cache
    pub parse_cache_ttl_ms: u64,
    pub parse_cache_max_entries: usize,
    pub max_items_page: usize,

    // Parsing
    pub fallback_group: String,
    pub fallback_title: String,

    // Link normalization
    pub redirector_template: String,
    pub manifest_host_marker: Option<String>,
    pub stream_proxy_prefix: Option<String>,
    pub stream_proxy_origin: Option<String>,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Like `var_or`, but a blank value also falls back to the default
fn non_blank_or(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Server
            port: parsed_or("PORT", 3001),
            app_env: var_or("APP_ENV", "development"),

            // Misc - Use VLC user agent to avoid IPTV server blocks
            user_agent: var_or("USER_AGENT", "VLC/3.0.20 LibVLC/3.0.20"),
            fetch_timeout_ms: parsed_or("FETCH_TIMEOUT_MS", 120_000), // 2 minutes
            max_retries: parsed_or("MAX_RETRIES", 3),
            max_m3u_size_mb: parsed_or("MAX_M3U_SIZE_MB", 100),

            parse_cache_ttl_ms: parsed_or("PARSE_CACHE_TTL_MS", 600_000), // 10 minutes
            parse_cache_max_entries: parsed_or("PARSE_CACHE_MAX_ENTRIES", 64),
            max_items_page: parsed_or("MAX_ITEMS_PAGE", 5000),

            // Never empty: entries always need a group and a title
            fallback_group: non_blank_or("FALLBACK_GROUP", DEFAULT_FALLBACK_GROUP),
            fallback_title: non_blank_or("FALLBACK_TITLE", DEFAULT_FALLBACK_TITLE),

            redirector_template: var_or("REDIRECTOR_TEMPLATE", DEFAULT_REDIRECTOR_TEMPLATE),
            // Set to an empty value to disable the manifest rewrite
            manifest_host_marker: match env::var("MANIFEST_HOST_MARKER") {
                Ok(v) => Some(v.trim().to_string()).filter(|v| !v.is_empty()),
                Err(_) => Some(DEFAULT_MANIFEST_HOST_MARKER.to_string()),
            },
            stream_proxy_prefix: optional("STREAM_PROXY_PREFIX"),
            stream_proxy_origin: optional("STREAM_PROXY_ORIGIN"),
        }
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            fallback_group: self.fallback_group.clone(),
            fallback_title: self.fallback_title.clone(),
            remove_duplicates: false,
        }
    }

    /// Link rules; the stream proxy needs both a prefix and an origin
    pub fn link_normalizer(&self) -> LinkNormalizer {
        let proxy = match (&self.stream_proxy_prefix, &self.stream_proxy_origin) {
            (Some(prefix), Some(origin)) => Some(StreamProxy {
                prefix: prefix.clone(),
                origin: origin.clone(),
            }),
            _ => None,
        };

        LinkNormalizer::new(
            &self.redirector_template,
            self.manifest_host_marker.clone(),
            proxy,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3001,
            app_env: "development".to_string(),
            user_agent: "VLC/3.0.20 LibVLC/3.0.20".to_string(),
            fetch_timeout_ms: 120_000,
            max_retries: 3,
            max_m3u_size_mb: 100,
            parse_cache_ttl_ms: 600_000,
            parse_cache_max_entries: 64,
            max_items_page: 5000,
            fallback_group: DEFAULT_FALLBACK_GROUP.to_string(),
            fallback_title: DEFAULT_FALLBACK_TITLE.to_string(),
            redirector_template: DEFAULT_REDIRECTOR_TEMPLATE.to_string(),
            manifest_host_marker: Some(DEFAULT_MANIFEST_HOST_MARKER.to_string()),
            stream_proxy_prefix: None,
            stream_proxy_origin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parser_options() {
        let config = Config::default();
        let options = config.parser_options();
        assert_eq!(options.fallback_group, "Diğer");
        assert_eq!(options.fallback_title, "Unknown");
        assert!(!options.remove_duplicates);
    }

    #[test]
    fn test_proxy_requires_prefix_and_origin() {
        let mut config = Config::default();
        config.stream_proxy_prefix = Some("https://proxy.example/url=".to_string());

        let links = config.link_normalizer();
        assert_eq!(
            links.normalize_for_group("https://load.origin.example/a.m3u8", "Film"),
            "https://load.origin.example/a.m3u8"
        );

        config.stream_proxy_origin = Some("https://load.origin.example/".to_string());
        let links = config.link_normalizer();
        assert_eq!(
            links.normalize_for_group("https://load.origin.example/a.m3u8", "Film"),
            "https://proxy.example/url=https://load.origin.example/a.m3u8"
        );
    }

    #[test]
    fn test_blank_fallback_labels_use_defaults() {
        std::env::set_var("KINO_TEST_BLANK_FALLBACK", "   ");
        assert_eq!(non_blank_or("KINO_TEST_BLANK_FALLBACK", "Diğer"), "Diğer");

        std::env::set_var("KINO_TEST_SET_FALLBACK", " Genel ");
        assert_eq!(non_blank_or("KINO_TEST_SET_FALLBACK", "Diğer"), "Genel");

        assert_eq!(non_blank_or("KINO_TEST_UNSET_FALLBACK", "Unknown"), "Unknown");
    }

    #[test]
    fn test_parsed_or_falls_back() {
        assert_eq!(parsed_or::<u16>("KINO_TEST_UNSET_VARIABLE", 42), 42);
    }
}
