use serde::{Deserialize, Serialize};

/// Normalized game metadata, whichever source produced it.
///
/// Every field except `key` is best-effort: a source that cannot extract a
/// value leaves it empty (or `false`) instead of failing the lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Lookup input, as the caller typed it (trimmed, case preserved)
    pub key: String,

    /// Source-assigned identifier (Steam app id)
    #[serde(default)]
    pub canonical_id: String,

    /// Game name
    #[serde(default)]
    pub display_name: String,

    /// Current price, formatted by the source (e.g. "$9.99")
    #[serde(default)]
    pub current_price: String,

    /// Historical lowest price (scraped catalog only)
    #[serde(default)]
    pub lowest_price: String,

    /// Price before discount (API only)
    #[serde(default)]
    pub original_price: String,

    /// ISO currency code of the prices (API only, e.g. "USD")
    #[serde(default)]
    pub currency: String,

    /// Critic/review score
    #[serde(default)]
    pub quality_score: String,

    /// Release date as shown by the source
    #[serde(default)]
    pub release_date: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Tags/genres, in source order; duplicates are kept
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub is_free: bool,

    #[serde(default)]
    pub is_on_sale: bool,

    /// Discount in percent, as text ("33")
    #[serde(default)]
    pub discount_percent: String,

    /// First listed developer
    #[serde(default)]
    pub developer: String,

    /// First listed publisher
    #[serde(default)]
    pub publisher: String,

    /// Header image URL
    #[serde(default)]
    pub header_image: String,

    /// Store/details page URL
    #[serde(default)]
    pub url: String,

    /// Source that produced the record (steam_api, steamdb)
    #[serde(default)]
    pub source: String,
}

impl Record {
    /// Create an empty record for a lookup key
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Whether any identity field was extracted
    pub fn has_identity(&self) -> bool {
        !self.canonical_id.is_empty() || !self.display_name.is_empty()
    }

    /// Get display name (for logging/UI)
    pub fn label(&self) -> String {
        match (self.display_name.is_empty(), self.canonical_id.is_empty()) {
            (false, false) => format!("{} ({})", self.display_name, self.canonical_id),
            (false, true) => self.display_name.clone(),
            (true, false) => format!("app {}", self.canonical_id),
            (true, true) => self.key.clone(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let record = Record::new("Half-Life 2");
        assert_eq!(record.key, "Half-Life 2");
        assert!(record.canonical_id.is_empty());
        assert!(record.tags.is_empty());
        assert!(!record.is_free);
        assert!(!record.has_identity());
    }

    #[test]
    fn test_label() {
        let mut record = Record::new("hl2");
        assert_eq!(record.label(), "hl2");

        record.canonical_id = "220".to_string();
        assert_eq!(record.label(), "app 220");

        record.display_name = "Half-Life 2".to_string();
        assert_eq!(record.label(), "Half-Life 2 (220)");
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let record = Record::from_json(r#"{"key":"portal","display_name":"Portal"}"#).unwrap();
        assert_eq!(record.display_name, "Portal");
        assert!(record.current_price.is_empty());
        assert!(!record.is_on_sale);
    }

    #[test]
    fn test_tags_keep_order_and_duplicates() {
        let mut record = Record::new("x");
        record.tags = vec!["FPS".into(), "Action".into(), "FPS".into()];
        let json = record.to_json().unwrap();
        let back = Record::from_json(&json).unwrap();
        assert_eq!(back.tags, vec!["FPS", "Action", "FPS"]);
    }
}
