use regex::Regex;

use crate::error::{LookupError, Result};
use crate::extract::{Cardinality, Decode, Extracted, FieldExtractor, FieldRule};

struct CompiledRule {
    field: String,
    regex: Regex,
    cardinality: Cardinality,
    scope: Option<Regex>,
    decode: Decode,
}

/// Regex-driven extractor over an ordered list of [`FieldRule`]s
pub struct PatternExtractor {
    rules: Vec<CompiledRule>,
}

impl PatternExtractor {
    /// Compile every rule up front; a bad pattern is a configuration error
    pub fn new(rules: Vec<FieldRule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let regex = compile(&rule.field, &rule.pattern)?;
                let scope = rule
                    .scope
                    .as_deref()
                    .map(|scope| compile(&rule.field, scope))
                    .transpose()?;
                Ok(CompiledRule {
                    field: rule.field,
                    regex,
                    cardinality: rule.cardinality,
                    scope,
                    decode: rule.decode,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Field names, in rule order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.field.as_str())
    }
}

fn compile(field: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| LookupError::Config(format!("bad pattern for field '{}': {}", field, e)))
}

impl CompiledRule {
    fn run(&self, text: &str) -> Vec<String> {
        let haystack = match &self.scope {
            Some(scope) => match scope.captures(text).and_then(|c| c.get(1)) {
                Some(m) => m.as_str(),
                None => return Vec::new(),
            },
            None => text,
        };

        let values = self.regex.captures_iter(haystack).filter_map(|caps| {
            let m = caps.get(1).or_else(|| caps.get(0))?;
            let value = self.decode.apply(m.as_str());
            (!value.is_empty()).then_some(value)
        });

        match self.cardinality {
            Cardinality::First => values.take(1).collect(),
            Cardinality::All => values.collect(),
        }
    }
}

impl FieldExtractor for PatternExtractor {
    fn extract(&self, text: &str) -> Extracted {
        let mut extracted = Extracted::new();
        for rule in &self.rules {
            let values = rule.run(text);
            if values.is_empty() {
                tracing::trace!("Field '{}' not found", rule.field);
            }
            extracted.insert(rule.field.clone(), values);
        }
        extracted
    }
}
