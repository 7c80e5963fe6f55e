//! Best-effort field extraction from semi-structured text.
//!
//! Sources never look at markup directly: they hand the raw body to a
//! [`FieldExtractor`] and read fields out of the resulting [`Extracted`] map.
//! The only implementation today is regex based ([`PatternExtractor`]); a
//! real HTML/JSON parser can slot in behind the same trait.

pub mod decode;
pub mod pattern;

pub use decode::Decode;
pub use pattern::PatternExtractor;

/// Turns raw text into named fields. Never fails: unmatched fields are absent.
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Extracted;
}

/// Ordered field → values map produced by an extractor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    fields: Vec<(String, Vec<String>)>,
}

impl Extracted {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record values for a field. Empty value lists are ignored so that
    /// "matched nothing" and "absent" are the same thing.
    pub fn insert(&mut self, field: impl Into<String>, values: Vec<String>) {
        if values.is_empty() {
            return;
        }
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => existing.extend(values),
            None => self.fields.push((field, values)),
        }
    }

    /// First value of a field
    pub fn first(&self, field: &str) -> Option<&str> {
        self.all(field).first().map(String::as_str)
    }

    /// Every value of a field, in match order
    pub fn all(&self, field: &str) -> &[String] {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// First value or empty string, for filling record fields
    pub fn text(&self, field: &str) -> String {
        self.first(field).unwrap_or_default().to_string()
    }

    pub fn has(&self, field: &str) -> bool {
        !self.all(field).is_empty()
    }

    /// Field names in extraction order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// How many matches a rule keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Singular fields: name, price, score, date, description
    First,
    /// Repeating fields: tags
    All,
}

/// One field → pattern entry of an extraction map
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub field: String,
    /// Regex; capture group 1 is the value (whole match if there is no group)
    pub pattern: String,
    pub cardinality: Cardinality,
    /// Optional regex whose first capture narrows the text the rule runs on
    pub scope: Option<String>,
    pub decode: Decode,
}

impl FieldRule {
    pub fn first(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            pattern: pattern.into(),
            cardinality: Cardinality::First,
            scope: None,
            decode: Decode::Raw,
        }
    }

    pub fn all(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            cardinality: Cardinality::All,
            ..Self::first(field, pattern)
        }
    }

    /// Only search inside the first capture of `scope`
    pub fn within(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn decode(mut self, decode: Decode) -> Self {
        self.decode = decode;
        self
    }
}
