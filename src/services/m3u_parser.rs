use sha1::{Digest, Sha1};
use std::collections::HashSet;

use crate::error::ParseError;
use crate::models::{ParseOptions, PlaylistEntry, PlaylistGroupMap, PlaylistStats};
use crate::services::attributes::{self, GROUP_TITLE, TVG_ID, TVG_LOGO, TVG_NAME};
use crate::services::heuristics::extract_season_episode;
use crate::services::links::LinkNormalizer;
use crate::services::normalizer::normalize;

pub const DEFAULT_FALLBACK_GROUP: &str = "Diğer";
pub const DEFAULT_FALLBACK_TITLE: &str = "Unknown";

const DIRECTIVE_MARKER: &str = "#EXTINF";
const HEADER_MARKER: &str = "#EXTM3U";

/// Parser settings
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Group for entries without a usable `group-title`
    pub fallback_group: String,
    /// Title for directives with an empty display title
    pub fallback_title: String,
    /// Skip entries whose resolved stream URL was already emitted
    pub remove_duplicates: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            fallback_group: DEFAULT_FALLBACK_GROUP.to_string(),
            fallback_title: DEFAULT_FALLBACK_TITLE.to_string(),
            remove_duplicates: false,
        }
    }
}

/// Directive waiting for its URL line
#[derive(Debug)]
struct PendingEntry {
    title: String,
    name: String,
    group_key: String,
    logo_url: Option<String>,
    series_or_channel_id: Option<String>,
    season_episode_label: Option<String>,
}

impl PendingEntry {
    fn into_entry(self, stream_url: String) -> PlaylistEntry {
        PlaylistEntry {
            title: self.title,
            name: self.name,
            group_key: self.group_key,
            logo_url: self.logo_url,
            series_or_channel_id: self.series_or_channel_id,
            season_episode_label: self.season_episode_label,
            stream_url,
        }
    }
}

/// Result of one parse
#[derive(Debug, Clone, Default)]
pub struct ParsedPlaylist {
    pub groups: PlaylistGroupMap,
    pub stats: PlaylistStats,
}

/// Generate SHA1 hash of URL for cache key
pub fn hash_url(url: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(url.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// Generate URL hash for deduplication (shorter than full SHA1)
fn url_dedup_hash(url: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    url.hash(&mut hasher);
    hasher.finish()
}

/// Text after the directive marker, if the line is a directive.
/// The marker is matched case-insensitively, with or without the colon.
fn directive_body(line: &str) -> Option<&str> {
    let marker = line.get(..DIRECTIVE_MARKER.len())?;
    if !marker.eq_ignore_ascii_case(DIRECTIVE_MARKER) {
        return None;
    }
    let rest = &line[DIRECTIVE_MARKER.len()..];
    Some(rest.strip_prefix(':').unwrap_or(rest))
}

fn is_header(line: &str) -> bool {
    line.get(..HEADER_MARKER.len())
        .map(|p| p.eq_ignore_ascii_case(HEADER_MARKER))
        .unwrap_or(false)
}

/// Byte index of the last comma outside double quotes.
///
/// Attribute values may contain commas ("A, B"), so the title starts after
/// the last unquoted comma rather than the first one.
fn find_title_separator(body: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut last = None;

    for (i, c) in body.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => last = Some(i),
            _ => {}
        }
    }

    last
}

/// M3U playlist parser
#[derive(Debug, Clone, Default)]
pub struct M3uParser {
    options: ParserOptions,
    links: LinkNormalizer,
}

impl M3uParser {
    pub fn new(options: ParserOptions, links: LinkNormalizer) -> Self {
        Self { options, links }
    }

    /// Copy of this parser with per-request options applied
    pub fn with_request_options(&self, request: ParseOptions) -> Self {
        let mut parser = self.clone();
        parser.options.remove_duplicates = request.remove_duplicates;
        parser
    }

    /// Parse an `#EXTINF` body into a pending entry
    fn parse_directive(&self, body: &str) -> PendingEntry {
        let (region, raw_title) = match find_title_separator(body) {
            Some(sep) => (&body[..sep], body[sep + 1..].trim()),
            None => ("", body.trim()),
        };

        let attrs = attributes::extract_attributes(region);

        let title = if raw_title.is_empty() {
            self.options.fallback_title.clone()
        } else {
            raw_title.to_string()
        };

        let name = attributes::non_empty(&attrs, TVG_NAME)
            .map(str::to_string)
            .unwrap_or_else(|| title.clone());

        let group_key = attributes::non_empty(&attrs, GROUP_TITLE)
            .map(str::to_string)
            .unwrap_or_else(|| self.options.fallback_group.clone());

        PendingEntry {
            season_episode_label: extract_season_episode(raw_title),
            title,
            name,
            group_key,
            logo_url: attributes::non_empty(&attrs, TVG_LOGO).map(str::to_string),
            series_or_channel_id: attributes::non_empty(&attrs, TVG_ID).map(str::to_string),
        }
    }

    /// Parse normalized playlist text into ordered groups
    pub fn parse(&self, text: &str) -> PlaylistGroupMap {
        self.parse_with_stats(text).groups
    }

    /// Single pass over normalized text, pairing each directive with the
    /// next content line.
    ///
    /// Never fails: a directive without a URL is dropped, a URL without a
    /// directive is skipped, missing fields get fallback values.
    pub fn parse_with_stats(&self, text: &str) -> ParsedPlaylist {
        let mut groups = PlaylistGroupMap::new();
        let mut stats = PlaylistStats::default();
        let mut pending: Option<PendingEntry> = None;
        let mut seen_urls: HashSet<u64> = HashSet::new();

        for raw_line in text.lines() {
            let line = raw_line.trim();

            if line.is_empty() {
                continue;
            }

            if let Some(body) = directive_body(line) {
                if let Some(dropped) = pending.replace(self.parse_directive(body)) {
                    stats.dropped_directives += 1;
                    tracing::trace!(title = %dropped.title, "directive without URL replaced");
                }
                continue;
            }

            // Other comments (#EXTVLCOPT, #EXTGRP, ...) leave the pending entry alone
            if line.starts_with('#') {
                if is_header(line) {
                    stats.has_header = true;
                }
                continue;
            }

            let Some(entry) = pending.take() else {
                stats.orphan_lines += 1;
                tracing::trace!(line, "content line without directive skipped");
                continue;
            };

            let stream_url = self.links.normalize_for_group(line, &entry.group_key);

            if self.options.remove_duplicates && !seen_urls.insert(url_dedup_hash(&stream_url)) {
                stats.duplicates_skipped += 1;
                continue;
            }

            groups.push(entry.into_entry(stream_url));
        }

        if let Some(dropped) = pending {
            stats.dropped_directives += 1;
            tracing::trace!(title = %dropped.title, "trailing directive without URL dropped");
        }

        stats.entries = groups.entry_count();
        stats.groups = groups.group_count();

        tracing::debug!(
            entries = stats.entries,
            groups = stats.groups,
            dropped = stats.dropped_directives,
            orphans = stats.orphan_lines,
            duplicates = stats.duplicates_skipped,
            "playlist parsed"
        );

        ParsedPlaylist { groups, stats }
    }

    /// Normalize raw text, then parse it
    pub fn parse_playlist(&self, raw: &str) -> ParsedPlaylist {
        self.parse_with_stats(&normalize(raw))
    }

    /// Decode raw bytes as UTF-8, normalize and parse.
    /// Bytes that are not text are the one input this parser rejects.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedPlaylist, ParseError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(self.parse_playlist(text))
    }
}

/// Parse normalized text with default options
pub fn parse(text: &str) -> PlaylistGroupMap {
    M3uParser::default().parse(text)
}

/// Normalize and parse raw text with default options
pub fn parse_playlist(raw: &str) -> PlaylistGroupMap {
    M3uParser::default().parse_playlist(raw).groups
}
