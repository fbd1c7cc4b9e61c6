use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

use crate::services::normalizer::fold_key;

/// Single playable playlist entry (channel/movie/episode)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    /// Display text after the last unquoted comma of the directive line
    pub title: String,
    /// `tvg-name` when present, else the title
    pub name: String,
    pub group_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// `tvg-id`, used to correlate with an external catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_or_channel_id: Option<String>,
    /// Canonical "N. Sezon M. Bölüm" label extracted from the title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_episode_label: Option<String>,
    pub stream_url: String,
}

/// One group bucket with entries in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistGroup {
    pub key: String,
    pub entries: Vec<PlaylistEntry>,
}

/// Insertion-ordered mapping from group key to entries.
///
/// Groups keep the order in which they were first seen and entries keep
/// their arrival order, so flattening and regrouping is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistGroupMap {
    groups: Vec<PlaylistGroup>,
    index: HashMap<String, usize>,
}

impl PlaylistGroupMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the group named by its `group_key`
    pub fn push(&mut self, entry: PlaylistEntry) {
        let key = entry.group_key.clone();
        self.push_under(key, entry);
    }

    /// Append an entry under an explicit key (used when rebucketing)
    pub fn push_under(&mut self, key: String, entry: PlaylistEntry) {
        match self.index.get(&key) {
            Some(&pos) => self.groups[pos].entries.push(entry),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(PlaylistGroup {
                    key,
                    entries: vec![entry],
                });
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&[PlaylistEntry]> {
        self.index
            .get(key)
            .map(|&pos| self.groups[pos].entries.as_slice())
    }

    pub fn contains_group(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Groups in first-seen order
    pub fn groups(&self) -> impl Iterator<Item = &PlaylistGroup> {
        self.groups.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.key.as_str())
    }

    /// All entries: groups in insertion order, then entries in insertion order
    pub fn flatten(&self) -> impl Iterator<Item = &PlaylistEntry> {
        self.groups.iter().flat_map(|g| g.entries.iter())
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Flatten and rebucket by a different key. Does not modify `self`.
    pub fn regroup_by<F>(&self, key_fn: F) -> PlaylistGroupMap
    where
        F: Fn(&PlaylistEntry) -> String,
    {
        let mut regrouped = PlaylistGroupMap::new();
        for entry in self.flatten() {
            regrouped.push_under(key_fn(entry), entry.clone());
        }
        regrouped
    }

    /// Find a group by a loosely written category name.
    /// Exact folded match first, then a folded substring match either way.
    pub fn find_group(&self, name: &str) -> Option<&PlaylistGroup> {
        let wanted = fold_key(name);
        if wanted.is_empty() {
            return None;
        }

        self.groups
            .iter()
            .find(|g| fold_key(&g.key) == wanted)
            .or_else(|| {
                self.groups.iter().find(|g| {
                    let key = fold_key(&g.key);
                    !key.is_empty() && (key.contains(&wanted) || wanted.contains(&key))
                })
            })
    }
}

impl Serialize for PlaylistGroupMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.groups.iter().map(|g| (&g.key, &g.entries)))
    }
}

/// Entries sharing one inferred series name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesCluster {
    /// Case-insensitive cluster key
    pub key: String,
    /// Casing of the first entry seen for this series
    pub display_name: String,
    pub entries: Vec<PlaylistEntry>,
}

/// Insertion-ordered series clusters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesClusters {
    clusters: Vec<SeriesCluster>,
    index: HashMap<String, usize>,
}

impl SeriesClusters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: String, display_name: &str, entry: PlaylistEntry) {
        match self.index.get(&key) {
            Some(&pos) => self.clusters[pos].entries.push(entry),
            None => {
                self.index.insert(key.clone(), self.clusters.len());
                self.clusters.push(SeriesCluster {
                    key,
                    display_name: display_name.to_string(),
                    entries: vec![entry],
                });
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&SeriesCluster> {
        self.index.get(key).map(|&pos| &self.clusters[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesCluster> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn into_vec(self) -> Vec<SeriesCluster> {
        self.clusters
    }
}

/// Season/episode numbers; either side may be unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonEpisode {
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl SeasonEpisode {
    pub fn is_empty(&self) -> bool {
        self.season.is_none() && self.episode.is_none()
    }

    /// "N. Sezon M. Bölüm" when both numbers are known
    pub fn canonical_label(&self) -> Option<String> {
        match (self.season, self.episode) {
            (Some(season), Some(episode)) => Some(format!("{}. Sezon {}. Bölüm", season, episode)),
            _ => None,
        }
    }
}

/// Counters collected during one parse
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistStats {
    pub entries: usize,
    pub groups: usize,
    /// Directives replaced by a later directive or left at end of input
    pub dropped_directives: usize,
    /// Content lines with no pending directive
    pub orphan_lines: usize,
    pub duplicates_skipped: usize,
    pub has_header: bool,
}

/// Request to fetch and parse a playlist
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseRequest {
    pub url: String,
    #[serde(default)]
    pub options: ParseOptions,
}

/// Per-request parsing options
#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOptions {
    #[serde(default)]
    pub remove_duplicates: bool,
}

/// Group name with its entry count
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub name: String,
    pub item_count: usize,
}

impl GroupSummary {
    pub fn from_map(map: &PlaylistGroupMap) -> Vec<GroupSummary> {
        map.groups()
            .map(|g| GroupSummary {
                name: g.key.clone(),
                item_count: g.entries.len(),
            })
            .collect()
    }
}

/// Parse response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    pub hash: String,
    pub cached: bool,
    pub parsed_at: i64,
    pub stats: PlaylistStats,
    pub groups: Vec<GroupSummary>,
}

/// Groups response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupsResponse {
    pub groups: Vec<GroupSummary>,
    pub total: usize,
}

/// Paginated entries response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsResponse {
    pub items: Vec<PlaylistEntry>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// Query parameters for the items endpoint
#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Query parameters for the series endpoint
#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    #[serde(default)]
    pub group: Option<String>,
}

/// Episode of a series cluster, with numbers resolved from its title
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesEpisode {
    #[serde(flatten)]
    pub entry: PlaylistEntry,
    #[serde(flatten)]
    pub numbers: SeasonEpisode,
}

/// Series cluster as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    pub key: String,
    pub name: String,
    pub episode_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub episodes: Vec<SeriesEpisode>,
}

/// Series response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesResponse {
    pub series: Vec<SeriesSummary>,
    pub total: usize,
}
