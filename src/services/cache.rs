//! In-memory LRU caches with optional expiry.
//!
//! Callers own their cache objects; nothing here is process-global.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::models::PlaylistEntry;
use crate::services::heuristics::{extract_series_name, resolve_imdb_id};
use crate::services::m3u_parser::ParsedPlaylist;
use crate::services::normalizer::fold_key;

struct CacheSlot<V> {
    value: V,
    inserted_at: Instant,
}

/// LRU cache whose entries expire after `ttl` (never, when `None`)
pub struct TtlCache<K: Hash + Eq, V: Clone> {
    inner: Mutex<LruCache<K, CacheSlot<V>>>,
    ttl: Option<Duration>,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<K, CacheSlot<V>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, slot: &CacheSlot<V>) -> bool {
        self.ttl
            .map(|ttl| slot.inserted_at.elapsed() >= ttl)
            .unwrap_or(false)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.lock();

        let expired = match cache.get(key) {
            Some(slot) if self.is_expired(slot) => true,
            Some(slot) => return Some(slot.value.clone()),
            None => return None,
        };

        if expired {
            cache.pop(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.lock().put(
            key,
            CacheSlot {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Cached value, or compute and store it. `compute` runs without the lock held.
    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// A parsed playlist kept by source hash
#[derive(Debug, Clone)]
pub struct CachedPlaylist {
    pub parsed: ParsedPlaylist,
    pub parsed_at: i64,
}

pub type ParseCache = TtlCache<String, Arc<CachedPlaylist>>;

/// Key for external catalog lookups: an IMDb id when one is known,
/// otherwise the folded series name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnrichmentKey {
    ExternalId(String),
    Title(String),
}

impl EnrichmentKey {
    pub fn for_entry(entry: &PlaylistEntry) -> Self {
        match resolve_imdb_id(entry) {
            Some(id) => EnrichmentKey::ExternalId(id),
            None => EnrichmentKey::Title(fold_key(&extract_series_name(&entry.title))),
        }
    }
}

/// Cache for catalog responses, owned and passed around by the caller
pub type EnrichmentCache<V> = TtlCache<EnrichmentKey, V>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn entry(title: &str, id: Option<&str>, url: &str) -> PlaylistEntry {
        PlaylistEntry {
            title: title.to_string(),
            name: title.to_string(),
            group_key: "Diğer".to_string(),
            logo_url: None,
            series_or_channel_id: id.map(str::to_string),
            season_episode_label: None,
            stream_url: url.to_string(),
        }
    }

    #[test]
    fn test_insert_get_and_evict() {
        let cache: TtlCache<String, u32> = TtlCache::new(2, None);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        // "b" is least recently used now
        cache.insert("c".to_string(), 3);
        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache: TtlCache<&str, u32> = TtlCache::new(4, Some(Duration::ZERO));
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_or_insert_with_computes_once() {
        let cache: TtlCache<&str, u32> = TtlCache::new(4, None);
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            42
        };

        assert_eq!(cache.get_or_insert_with("k", compute), 42);
        assert_eq!(cache.get_or_insert_with("k", compute), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_zero_capacity_still_caches() {
        let cache: TtlCache<&str, u32> = TtlCache::new(0, None);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
    }

    #[test]
    fn test_enrichment_key_prefers_external_id() {
        let with_id = entry("Film", Some("tt7654321"), "http://x/1");
        assert_eq!(
            EnrichmentKey::for_entry(&with_id),
            EnrichmentKey::ExternalId("tt7654321".to_string())
        );

        let from_url = entry("Film", None, "https://provider.example/vs/tt1111111/master.m3u8");
        assert_eq!(
            EnrichmentKey::for_entry(&from_url),
            EnrichmentKey::ExternalId("tt1111111".to_string())
        );

        let a = entry("Yalı Çapkını - 1. Sezon 1. Bölüm", None, "http://x/1");
        let b = entry("YALI ÇAPKINI - 1. Sezon 2. Bölüm", None, "http://x/2");
        assert_eq!(EnrichmentKey::for_entry(&a), EnrichmentKey::Title("yali capkini".to_string()));
        assert_eq!(EnrichmentKey::for_entry(&a), EnrichmentKey::for_entry(&b));
    }

    #[test]
    fn test_enrichment_cache_shared_by_episodes() {
        let cache: EnrichmentCache<String> = TtlCache::new(16, None);
        let a = entry("Dizi - 1. Sezon 1. Bölüm", None, "http://x/1");
        let b = entry("dizi - 1. Sezon 2. Bölüm", None, "http://x/2");

        cache.insert(EnrichmentKey::for_entry(&a), "overview".to_string());
        assert_eq!(cache.get(&EnrichmentKey::for_entry(&b)).as_deref(), Some("overview"));
    }
}
