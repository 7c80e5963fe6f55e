use serde::{Deserialize, Serialize};
use crate::core::Record;

/// Lookup result with the metadata presentation layers like to show
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupResponse {
    /// The normalized record
    pub record: Record,

    /// Whether the record came from the in-process cache
    pub from_cache: bool,

    /// Source that produced the record ("cache" on hits)
    pub source: String,

    /// Lookup latency in milliseconds
    pub latency_ms: f64,
}

impl LookupResponse {
    /// Response for a freshly fetched record
    pub fn fetched(record: Record, latency_ms: f64) -> Self {
        let source = record.source.clone();
        Self {
            record,
            from_cache: false,
            source,
            latency_ms,
        }
    }

    /// Response served from the cache
    pub fn cached(record: Record, latency_ms: f64) -> Self {
        Self {
            record,
            from_cache: true,
            source: "cache".to_string(),
            latency_ms,
        }
    }

    /// Get display string for logging
    pub fn display(&self) -> String {
        format!(
            "{} [{}] {:.2}ms",
            self.record.label(),
            self.source,
            self.latency_ms
        )
    }
}
