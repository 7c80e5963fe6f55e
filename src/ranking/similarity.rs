use rapidfuzz::distance::jaro_winkler;

use crate::ranking::{Ranker, RankedCandidate};
use crate::sources::catalog::CatalogEntry;

/// Jaro-Winkler ranker for catalog candidates
pub struct JaroWinklerRanker;

impl JaroWinklerRanker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JaroWinklerRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl Ranker for JaroWinklerRanker {
    fn rank(&self, query: &str, candidates: &[CatalogEntry]) -> Vec<RankedCandidate> {
        let query_lower = query.to_lowercase();

        let mut ranked: Vec<RankedCandidate> = candidates
            .iter()
            .map(|entry| {
                // Jaro-Winkler similarity (0.0 - 1.0), as percentage
                let score = jaro_winkler::normalized_similarity(
                    query_lower.chars(),
                    entry.name.chars(),
                ) * 100.0;

                RankedCandidate::new(*entry, score)
            })
            .collect();

        // Stable: equal scores keep table order
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        ranked
    }

    fn name(&self) -> &str {
        "jaro-winkler"
    }
}
