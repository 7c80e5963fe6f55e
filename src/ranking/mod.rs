pub mod similarity;

use crate::sources::catalog::CatalogEntry;

pub use similarity::JaroWinklerRanker;

/// Orders name-table candidates for a free-text query
pub trait Ranker: Send + Sync {
    /// Rank candidates against query, return sorted by score (highest first)
    fn rank(&self, query: &str, candidates: &[CatalogEntry]) -> Vec<RankedCandidate>;

    /// Get ranker name for logging
    fn name(&self) -> &str;
}

/// Candidate with similarity score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCandidate {
    pub entry: CatalogEntry,
    pub score: f64,
}

impl RankedCandidate {
    pub fn new(entry: CatalogEntry, score: f64) -> Self {
        Self { entry, score }
    }
}
