//! Local name → Steam app id table for free-text API lookups.
//!
//! The store API has no search endpoint, so titles are resolved here first.
//! The table is small and fixed; names are lowercase and sorted.

use crate::ranking::{JaroWinklerRanker, Ranker};

/// Upper bound on candidates resolved for one query (each costs a detail call)
pub const MAX_CANDIDATES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub app_id: &'static str,
}

const fn entry(name: &'static str, app_id: &'static str) -> CatalogEntry {
    CatalogEntry { name, app_id }
}

pub static CATALOG: &[CatalogEntry] = &[
    entry("age of empires", "1466860"),
    entry("among us", "945360"),
    entry("apex legends", "1172470"),
    entry("ark", "346110"),
    entry("assassin's creed", "1368820"),
    entry("battlefield", "1517290"),
    entry("borderlands 3", "397540"),
    entry("call of duty", "1938090"),
    entry("celeste", "504230"),
    entry("cities skylines", "255710"),
    entry("civilization vi", "289070"),
    entry("control", "870780"),
    entry("counter-strike", "730"),
    entry("counter-strike 2", "730"),
    entry("cs2", "730"),
    entry("cyberpunk", "1091500"),
    entry("cyberpunk 2077", "1091500"),
    entry("dark souls 3", "374320"),
    entry("death stranding", "1190460"),
    entry("destiny 2", "1085660"),
    entry("devil may cry", "601150"),
    entry("disco elysium", "632470"),
    entry("dota", "570"),
    entry("dota 2", "570"),
    entry("elden ring", "1245620"),
    entry("elder scrolls v", "72850"),
    entry("factorio", "427520"),
    entry("fallout 4", "377160"),
    entry("far cry", "552520"),
    entry("fifa", "1313860"),
    entry("final fantasy", "1313600"),
    entry("football manager", "1569040"),
    entry("forza horizon", "1551360"),
    entry("god of war", "1593500"),
    entry("grand theft auto v", "271590"),
    entry("gta v", "271590"),
    entry("hades", "1145360"),
    entry("half-life 2", "220"),
    entry("hitman", "1659040"),
    entry("hollow knight", "367520"),
    entry("left 4 dead 2", "550"),
    entry("metro exodus", "412020"),
    entry("microsoft flight simulator", "1250410"),
    entry("minecraft", "1238430"),
    entry("monster hunter", "1334050"),
    entry("no man's sky", "275850"),
    entry("ori and the blind forest", "261570"),
    entry("portal", "400"),
    entry("portal 2", "620"),
    entry("pubg", "578080"),
    entry("red dead redemption 2", "1174180"),
    entry("resident evil", "1196590"),
    entry("rimworld", "294100"),
    entry("rocket league", "252950"),
    entry("rust", "252490"),
    entry("sea of thieves", "1172620"),
    entry("skyrim", "72850"),
    entry("stardew valley", "413150"),
    entry("subnautica", "264710"),
    entry("team fortress 2", "440"),
    entry("terraria", "105600"),
    entry("tf2", "440"),
    entry("the witcher 3", "292030"),
    entry("tomb raider", "750920"),
    entry("total war", "364360"),
    entry("valheim", "892970"),
    entry("warframe", "230410"),
    entry("watch dogs", "1208080"),
    entry("witcher 3", "292030"),
];

/// Candidates for a free-text query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    /// Case-insensitive exact name match
    pub exact: Option<CatalogEntry>,
    /// Substring matches in either direction, best first, one per app id
    pub partial: Vec<CatalogEntry>,
}

impl Candidates {
    pub fn is_empty(&self) -> bool {
        self.exact.is_none() && self.partial.is_empty()
    }

    pub fn len(&self) -> usize {
        usize::from(self.exact.is_some()) + self.partial.len()
    }

    /// Exact match first, then partial matches
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.exact.iter().chain(self.partial.iter())
    }
}

/// Resolve `query` against the default table
pub fn resolve(query: &str) -> Candidates {
    resolve_in(CATALOG, query, MAX_CANDIDATES)
}

/// Resolve against an arbitrary table, keeping at most `limit` candidates in total
pub fn resolve_in(table: &[CatalogEntry], query: &str, limit: usize) -> Candidates {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() || limit == 0 {
        return Candidates::default();
    }

    let exact = table.iter().find(|e| e.name == needle).copied();

    let mut seen: Vec<&str> = exact.iter().map(|e| e.app_id).collect();
    let matches: Vec<CatalogEntry> = table
        .iter()
        .filter(|e| e.name.contains(needle.as_str()) || needle.contains(e.name))
        .copied()
        .collect();

    let ranker = JaroWinklerRanker::new();
    let ranked = ranker.rank(&needle, &matches);
    tracing::trace!("Ranked {} name matches for '{}' with {}", ranked.len(), needle, ranker.name());
    let room = limit - usize::from(exact.is_some());
    let mut partial = Vec::new();
    for candidate in ranked {
        if partial.len() >= room {
            break;
        }
        if seen.contains(&candidate.entry.app_id) {
            continue;
        }
        seen.push(candidate.entry.app_id);
        partial.push(candidate.entry);
    }

    Candidates { exact, partial }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_and_lowercase() {
        for pair in CATALOG.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} >= {}", pair[0].name, pair[1].name);
        }
        assert!(CATALOG.iter().all(|e| e.name == e.name.to_lowercase()));
        assert!(CATALOG.iter().all(|e| e.app_id.chars().all(|c| c.is_ascii_digit())));
    }

    #[test]
    fn test_exact_match_comes_first() {
        let candidates = resolve("Portal");
        assert_eq!(candidates.exact.map(|e| e.app_id), Some("400"));
        // "portal 2" still offered as a partial match
        assert_eq!(candidates.partial.first().map(|e| e.app_id), Some("620"));
        assert_eq!(candidates.iter().next().map(|e| e.app_id), Some("400"));
    }

    #[test]
    fn test_substring_either_direction() {
        // query inside a table name
        let candidates = resolve("witcher");
        assert!(candidates.exact.is_none());
        assert_eq!(candidates.partial.len(), 1); // both entries share app 292030
        assert_eq!(candidates.partial[0].app_id, "292030");

        // table name inside the query
        let candidates = resolve("elden ring nightreign");
        assert_eq!(candidates.partial.first().map(|e| e.app_id), Some("1245620"));
    }

    #[test]
    fn test_exact_app_id_not_repeated_in_partials() {
        let candidates = resolve("dota");
        assert_eq!(candidates.exact.map(|e| e.app_id), Some("570"));
        assert!(candidates.partial.iter().all(|e| e.app_id != "570"));
    }

    #[test]
    fn test_candidates_are_capped() {
        // single letters hit most of the table
        let candidates = resolve("e");
        assert_eq!(candidates.len(), MAX_CANDIDATES);
    }

    #[test]
    fn test_no_match() {
        assert!(resolve("zzz-nonexistent-zzz").is_empty());
        assert!(resolve("   ").is_empty());
    }
}
