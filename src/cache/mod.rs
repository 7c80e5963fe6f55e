pub mod memory;

use chrono::{DateTime, Utc};
use crate::core::Record;

pub use memory::RecordCache;

/// Cached record with metadata
#[derive(Debug, Clone)]
pub struct CachedRecord {
    pub key: String,
    pub record: Record,
    pub hit_count: u64,
    pub cached_at: DateTime<Utc>,
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: u64,
    pub total_hits: u64,
    pub total_misses: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

impl CacheStats {
    /// Share of `get`/`has` calls that found an entry
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.total_hits + self.total_misses;
        if lookups == 0 {
            0.0
        } else {
            self.total_hits as f64 / lookups as f64
        }
    }
}
