use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use chrono::Utc;

use crate::cache::{CachedRecord, CacheStats};
use crate::core::Record;
use crate::error::{LookupError, Result};

#[derive(Default)]
struct Inner {
    entries: HashMap<String, CachedRecord>,
    hits: u64,
    misses: u64,
}

/// Process-lifetime record cache.
///
/// One entry per key (exact match after trimming). Entries never expire;
/// only [`RecordCache::clear`] removes them. Every operation takes the same
/// lock and does no I/O while holding it. Readers get clones.
#[derive(Default)]
pub struct RecordCache {
    inner: Mutex<Inner>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize key for consistent cache lookups
    fn normalize_key(key: &str) -> &str {
        key.trim()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic elsewhere cannot leave the map half-written, so keep serving
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a record is stored for `key`. A `false` counts as a miss.
    pub fn has(&self, key: &str) -> bool {
        let mut inner = self.lock();
        let present = inner.entries.contains_key(Self::normalize_key(key));
        if !present {
            inner.misses += 1;
        }
        present
    }

    /// Copy of the stored record, or `NotFound`
    pub fn get(&self, key: &str) -> Result<Record> {
        let key = Self::normalize_key(key);
        let mut inner = self.lock();

        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.hit_count += 1;
                let record = entry.record.clone();
                inner.hits += 1;
                Ok(record)
            }
            None => {
                inner.misses += 1;
                Err(LookupError::NotFound(format!("'{}' is not cached", key)))
            }
        }
    }

    /// Copy of the stored entry with its metadata
    pub fn entry(&self, key: &str) -> Option<CachedRecord> {
        self.lock().entries.get(Self::normalize_key(key)).cloned()
    }

    /// Store `record` under `key`, replacing any previous entry.
    /// The hit counter of a replaced entry carries over.
    pub fn put(&self, key: &str, record: Record) {
        let key = Self::normalize_key(key).to_string();
        let mut inner = self.lock();

        let hit_count = inner.entries.get(&key).map(|e| e.hit_count).unwrap_or(0);
        inner.entries.insert(
            key.clone(),
            CachedRecord {
                key,
                record,
                hit_count,
                cached_at: Utc::now(),
            },
        );
    }

    /// Remove every entry and reset counters
    pub fn clear(&self) {
        let mut inner = self.lock();
        let removed = inner.entries.len();
        *inner = Inner::default();
        drop(inner);
        tracing::info!("🧹 Cache cleared ({} entries)", removed);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            total_entries: inner.entries.len() as u64,
            total_hits: inner.hits,
            total_misses: inner.misses,
            oldest_entry: inner.entries.values().map(|e| e.cached_at).min(),
            newest_entry: inner.entries.values().map(|e| e.cached_at).max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(key: &str, name: &str) -> Record {
        let mut record = Record::new(key);
        record.display_name = name.to_string();
        record
    }

    #[test]
    fn test_cache_create() {
        let cache = RecordCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_cache_put_and_get() {
        let cache = RecordCache::new();
        cache.put("cs2", record("cs2", "Counter-Strike 2"));

        assert!(cache.has("cs2"));
        let cached = cache.get("cs2").unwrap();
        assert_eq!(cached.display_name, "Counter-Strike 2");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let cache = RecordCache::new();
        assert!(matches!(cache.get("nope"), Err(LookupError::NotFound(_))));
    }

    #[test]
    fn test_keys_are_exact_after_trim() {
        let cache = RecordCache::new();
        cache.put("  Portal  ", record("Portal", "Portal"));

        assert!(cache.has("Portal"));
        assert!(cache.has(" Portal"));
        assert!(!cache.has("portal"));
    }

    #[test]
    fn test_put_overwrites_and_keeps_hits() {
        let cache = RecordCache::new();
        cache.put("hl2", record("hl2", "Old"));
        cache.get("hl2").unwrap();
        cache.put("hl2", record("hl2", "New"));

        assert_eq!(cache.len(), 1);
        let entry = cache.entry("hl2").unwrap();
        assert_eq!(entry.record.display_name, "New");
        assert_eq!(entry.hit_count, 1);
    }

    #[test]
    fn test_returned_record_is_a_copy() {
        let cache = RecordCache::new();
        cache.put("x", record("x", "Original"));

        let mut copy = cache.get("x").unwrap();
        copy.display_name = "Changed".to_string();

        assert_eq!(cache.get("x").unwrap().display_name, "Original");
    }

    #[test]
    fn test_clear() {
        let cache = RecordCache::new();
        cache.put("a", record("a", "A"));
        cache.put("b", record("b", "B"));
        cache.clear();

        assert!(cache.is_empty());
        assert!(!cache.has("a"));
    }

    #[test]
    fn test_cache_stats() {
        let cache = RecordCache::new();
        cache.put("game1", record("game1", "Game1"));
        cache.put("game2", record("game2", "Game2"));

        cache.get("game1").unwrap();
        cache.get("game1").unwrap();
        cache.get("game2").unwrap();
        assert!(!cache.has("game3"));

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_hits, 3);
        assert_eq!(stats.total_misses, 1);
        assert_eq!(stats.hit_ratio(), 0.75);
        assert!(stats.oldest_entry.is_some());
        assert!(stats.oldest_entry <= stats.newest_entry);
        assert_eq!(cache.keys(), vec!["game1", "game2"]);
    }

    #[test]
    fn test_concurrent_puts_keep_one_entry_per_key() {
        let cache = Arc::new(RecordCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        cache.put(&format!("key{}", j % 5), record("k", &format!("w{}", i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 5);
    }
}
