//! Season/episode and series-name heuristics for free-text titles.
//!
//! Titles come from many independent playlist producers, so numbering is
//! recognised by an ordered rule table: the first rule that matches wins
//! and every match is rendered in one canonical shape,
//! `"{season}. Sezon {episode}. Bölüm"`.
//!
//! The rule table is append-only. Inserting a rule ahead of an existing one
//! changes the result for titles that already canonicalize.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::models::{PlaylistEntry, SeasonEpisode, SeriesClusters};
use crate::services::m3u_parser::DEFAULT_FALLBACK_TITLE;
use crate::services::normalizer::fold_turkish;

/// Separator between series name and episode text ("Dizi - 1. Sezon 2. Bölüm")
pub const SERIES_SEPARATOR: &str = " - ";

/// A named pattern capturing season in group 1 and episode in group 2
struct SeasonEpisodeRule {
    name: &'static str,
    pattern: Regex,
}

impl SeasonEpisodeRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
        }
    }
}

lazy_static! {
    static ref SEASON_EPISODE_RULES: Vec<SeasonEpisodeRule> = vec![
        // "1.Sezon 2.Bölüm", "1. Sezon 2. Bölüm", "1 sezon 2 bölüm"
        SeasonEpisodeRule::new(
            "number-sezon-number-bolum",
            r"(?i)([0-9]+)\s*\.?\s*sezon\s*([0-9]+)\s*\.?\s*b[öo]l[üu]m",
        ),
        // "Sezon 1 Bölüm 2"
        SeasonEpisodeRule::new(
            "sezon-number-bolum-number",
            r"(?i)sezon\s*([0-9]+)\s*[.,:\-]?\s*b[öo]l[üu]m\s*([0-9]+)",
        ),
        // "S01E02", "S1 E2", "Show_S01E02_1080p", "S01E02E03"
        SeasonEpisodeRule::new(
            "s-e",
            r"(?i)(?:^|[^a-z0-9])s([0-9]{1,2})\s?e([0-9]{1,3})(?:[^0-9]|$)",
        ),
        // "Season 1 Episode 2"
        SeasonEpisodeRule::new(
            "season-episode",
            r"(?i)\bseason\s*([0-9]+)\s*[.,:\-]?\s*episode\s*([0-9]+)",
        ),
        // "1x05"
        SeasonEpisodeRule::new("n-x-m", r"(?i)\b([0-9]{1,2})x([0-9]{1,3})\b"),
    ];

    // Partial matches: numbering split across the title
    static ref SEASON_ONLY: Regex = Regex::new(
        r"(?i)(?:([0-9]+)\s*\.?\s*(?:sezon|season|temporada)\b|\b(?:sezon|season|temporada)\s*([0-9]+))"
    ).unwrap();
    static ref EPISODE_ONLY: Regex = Regex::new(
        r"(?i)(?:([0-9]+)\s*\.?\s*(?:b[öo]l[üu]m|episode|episodio)\b|\b(?:b[öo]l[üu]m|episode|episodio)\s*([0-9]+))"
    ).unwrap();

    static ref IMDB_ID: Regex = Regex::new(r"(?i)tt[0-9]{7,}").unwrap();
    static ref BARE_IMDB_NUMBER: Regex = Regex::new(r"^[0-9]{7,}$").unwrap();
}

/// Base-10 parse; anything that does not fit is rejected, never read as 0.
fn parse_number(text: &str) -> Option<u32> {
    text.parse::<u32>().ok()
}

/// First numeric capture among the given groups
fn first_number(caps: &Captures, groups: &[usize]) -> Option<u32> {
    groups
        .iter()
        .find_map(|&i| caps.get(i))
        .and_then(|m| parse_number(m.as_str()))
}

/// Run the ordered rule table; returns the first rule whose numbers parse.
fn match_rules(title: &str) -> Option<(&'static str, SeasonEpisode)> {
    SEASON_EPISODE_RULES.iter().find_map(|rule| {
        let caps = rule.pattern.captures(title)?;
        let season = first_number(&caps, &[1])?;
        let episode = first_number(&caps, &[2])?;
        Some((
            rule.name,
            SeasonEpisode {
                season: Some(season),
                episode: Some(episode),
            },
        ))
    })
}

/// Canonical "N. Sezon M. Bölüm" label, or `None` when no rule matches.
///
/// `None` means unknown; callers must not read it as season 0.
pub fn extract_season_episode(title: &str) -> Option<String> {
    let (rule, numbers) = match_rules(title)?;
    tracing::trace!(rule, title, "season/episode rule matched");
    numbers.canonical_label()
}

/// Season/episode numbers, accepting titles where only one of them is
/// present ("Sezon 3", "Bölüm 5").
pub fn parse_season_episode(title: &str) -> SeasonEpisode {
    if let Some((_, numbers)) = match_rules(title) {
        return numbers;
    }

    SeasonEpisode {
        season: SEASON_ONLY
            .captures(title)
            .and_then(|caps| first_number(&caps, &[1, 2])),
        episode: EPISODE_ONLY
            .captures(title)
            .and_then(|caps| first_number(&caps, &[1, 2])),
    }
}

/// Series name: the text before the first `" - "`, or the whole title.
pub fn extract_series_name(title: &str) -> String {
    let name = title.split(SERIES_SEPARATOR).next().unwrap_or_default().trim();

    if name.is_empty() {
        DEFAULT_FALLBACK_TITLE.to_string()
    } else {
        name.to_string()
    }
}

/// Case-insensitive clustering key for a series name.
/// Turkish dotted and dotless i fold together ("YALI" and "Yalı" match).
pub fn series_key(name: &str) -> String {
    fold_turkish(name.trim())
}

/// Cluster entries by a derived display name, compared case-insensitively.
/// The first casing seen becomes the cluster's display name.
pub fn cluster_by<'a, I, F>(entries: I, name_fn: F) -> SeriesClusters
where
    I: IntoIterator<Item = &'a PlaylistEntry>,
    F: Fn(&PlaylistEntry) -> String,
{
    let mut clusters = SeriesClusters::new();
    for entry in entries {
        let name = name_fn(entry);
        clusters.push(series_key(&name), &name, entry.clone());
    }
    clusters
}

/// Cluster entries by the series name inferred from their titles
pub fn cluster_by_series<'a, I>(entries: I) -> SeriesClusters
where
    I: IntoIterator<Item = &'a PlaylistEntry>,
{
    cluster_by(entries, |e| extract_series_name(&e.title))
}

/// Cluster entries by their `name` (the `tvg-name` attribute when present)
pub fn cluster_by_name<'a, I>(entries: I) -> SeriesClusters
where
    I: IntoIterator<Item = &'a PlaylistEntry>,
{
    cluster_by(entries, |e| e.name.clone())
}

/// IMDb-style id for an entry, lowercased.
///
/// Looks at `tvg-id` first (either "tt1234567" or a bare 7+ digit number),
/// then falls back to scanning the stream URL.
pub fn resolve_imdb_id(entry: &PlaylistEntry) -> Option<String> {
    if let Some(id) = entry.series_or_channel_id.as_deref().map(str::trim) {
        if let Some(m) = IMDB_ID.find(id) {
            return Some(m.as_str().to_lowercase());
        }
        if BARE_IMDB_NUMBER.is_match(id) {
            return Some(format!("tt{}", id));
        }
    }

    IMDB_ID
        .find(&entry.stream_url)
        .map(|m| m.as_str().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, url: &str) -> PlaylistEntry {
        PlaylistEntry {
            title: title.to_string(),
            name: title.to_string(),
            group_key: "Diziler".to_string(),
            logo_url: None,
            series_or_channel_id: None,
            season_episode_label: None,
            stream_url: url.to_string(),
        }
    }

    #[test]
    fn test_canonicalizes_all_source_shapes() {
        for title in ["1.Sezon 2.Bölüm", "Sezon 1 Bölüm 2", "S01E02"] {
            assert_eq!(
                extract_season_episode(title).as_deref(),
                Some("1. Sezon 2. Bölüm"),
                "title: {}",
                title
            );
        }
    }

    #[test]
    fn test_extract_season_episode_in_context() {
        assert_eq!(
            extract_season_episode("Kurtlar Vadisi - 10. Sezon 25. Bölüm").as_deref(),
            Some("10. Sezon 25. Bölüm")
        );
        assert_eq!(
            extract_season_episode("Breaking Bad S1 E10 720p").as_deref(),
            Some("1. Sezon 10. Bölüm")
        );
        assert_eq!(
            extract_season_episode("AŞK-I MEMNU 2. SEZON 3. BÖLÜM").as_deref(),
            Some("2. Sezon 3. Bölüm")
        );
        assert_eq!(
            extract_season_episode("Lost Season 4 Episode 7").as_deref(),
            Some("4. Sezon 7. Bölüm")
        );
        assert_eq!(
            extract_season_episode("Friends 3x12").as_deref(),
            Some("3. Sezon 12. Bölüm")
        );
    }

    #[test]
    fn test_s_e_inside_release_names() {
        for title in [
            "Show_S01E02_1080p",
            "Dizi S01E02E03",
            "Dizi S01E02HD",
            "Show.S01E02.720p",
            "s01e02",
        ] {
            assert_eq!(
                extract_season_episode(title).as_deref(),
                Some("1. Sezon 2. Bölüm"),
                "title: {}",
                title
            );
        }
        // not a season marker when glued to a word
        assert_eq!(extract_season_episode("Mars01E02"), None);
        assert_eq!(extract_season_episode("S01E0234"), None);
    }

    #[test]
    fn test_first_rule_wins() {
        // both the Turkish and the SxxEyy form are present
        assert_eq!(
            extract_season_episode("Dizi 2. Sezon 5. Bölüm (S09E09)").as_deref(),
            Some("2. Sezon 5. Bölüm")
        );
    }

    #[test]
    fn test_no_match_is_none() {
        assert_eq!(extract_season_episode("Standalone Movie Title"), None);
        assert_eq!(extract_season_episode("Film 1920x1080"), None);
        assert_eq!(extract_season_episode(""), None);
    }

    #[test]
    fn test_overflowing_numbers_are_rejected() {
        assert_eq!(extract_season_episode("99999999999. Sezon 1. Bölüm"), None);
    }

    #[test]
    fn test_parse_season_episode_partial() {
        assert_eq!(
            parse_season_episode("Sezon 3"),
            SeasonEpisode { season: Some(3), episode: None }
        );
        assert_eq!(
            parse_season_episode("Bölüm 5"),
            SeasonEpisode { season: None, episode: Some(5) }
        );
        assert_eq!(
            parse_season_episode("Yalı Çapkını 2. Sezon"),
            SeasonEpisode { season: Some(2), episode: None }
        );
        assert_eq!(
            parse_season_episode("Sezon 1 Bölüm 2"),
            SeasonEpisode { season: Some(1), episode: Some(2) }
        );
        assert!(parse_season_episode("Yeni Film").is_empty());
    }

    #[test]
    fn test_extract_series_name() {
        assert_eq!(extract_series_name("Breaking Bad - 1. Sezon 1. Bölüm"), "Breaking Bad");
        assert_eq!(extract_series_name("Standalone Movie Title"), "Standalone Movie Title");
        assert_eq!(extract_series_name("  Dizi  - A - B"), "Dizi");
        assert_eq!(extract_series_name(" - 1. Bölüm"), DEFAULT_FALLBACK_TITLE);
        assert_eq!(extract_series_name(""), DEFAULT_FALLBACK_TITLE);
    }

    #[test]
    fn test_cluster_by_series_case_insensitive() {
        let entries = vec![
            entry("Breaking Bad - 1. Sezon 1. Bölüm", "http://x/1"),
            entry("Movie", "http://x/2"),
            entry("BREAKING BAD - 1. Sezon 2. Bölüm", "http://x/3"),
        ];

        let clusters = cluster_by_series(&entries);
        assert_eq!(clusters.len(), 2);

        let bb = clusters.get("breaking bad").unwrap();
        assert_eq!(bb.display_name, "Breaking Bad");
        let urls: Vec<&str> = bb.entries.iter().map(|e| e.stream_url.as_str()).collect();
        assert_eq!(urls, vec!["http://x/1", "http://x/3"]);

        let order: Vec<&str> = clusters.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(order, vec!["breaking bad", "movie"]);
    }

    #[test]
    fn test_cluster_by_series_folds_turkish_case() {
        let entries = vec![
            entry("Yalı Çapkını - 1. Sezon 1. Bölüm", "http://x/1"),
            entry("YALI ÇAPKINI - 1. Sezon 2. Bölüm", "http://x/2"),
            entry("yali capkini - 1. Sezon 3. Bölüm", "http://x/3"),
        ];

        let clusters = cluster_by_series(&entries);
        assert_eq!(clusters.len(), 1);

        let cluster = clusters.get("yali capkini").unwrap();
        assert_eq!(cluster.display_name, "Yalı Çapkını");
        assert_eq!(cluster.entries.len(), 3);
    }

    #[test]
    fn test_cluster_by_name() {
        let mut a = entry("Ep 1", "http://x/1");
        a.name = "Yalı Çapkını".to_string();
        let mut b = entry("Ep 2", "http://x/2");
        b.name = "yalı çapkını".to_string();

        let clusters = cluster_by_name(&[a, b]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters.iter().next().unwrap().display_name, "Yalı Çapkını");
    }

    #[test]
    fn test_resolve_imdb_id() {
        let mut e = entry("Film", "https://provider.example/vs/tt7654321");
        assert_eq!(resolve_imdb_id(&e).as_deref(), Some("tt7654321"));

        e.series_or_channel_id = Some("TT1234567".to_string());
        assert_eq!(resolve_imdb_id(&e).as_deref(), Some("tt1234567"));

        e.series_or_channel_id = Some("0944947".to_string());
        assert_eq!(resolve_imdb_id(&e).as_deref(), Some("tt0944947"));

        let plain = entry("Kanal", "http://x/live.m3u8");
        assert_eq!(resolve_imdb_id(&plain), None);
    }
}
