use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LookupConfig;
use crate::core::Record;
use crate::error::{LookupError, Result};
use crate::sources::RecordSource;

/// When an API failure sends the lookup on to the scraper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// API `NotFound` is final; other upstream failures fall back
    #[default]
    TrustApiNotFound,
    /// Any API failure falls back
    AlwaysScrape,
}

impl FallbackPolicy {
    pub fn from_config(config: &LookupConfig) -> Self {
        if config.fallback_on_api_not_found {
            FallbackPolicy::AlwaysScrape
        } else {
            FallbackPolicy::TrustApiNotFound
        }
    }

    /// Whether `err` from the API source should be retried against the scraper
    pub fn should_fall_back(&self, err: &LookupError) -> bool {
        match err {
            LookupError::InvalidInput(_) => false,
            LookupError::NotFound(_) => *self == FallbackPolicy::AlwaysScrape,
            LookupError::Auth(_)
            | LookupError::Network { .. }
            | LookupError::Status { .. }
            | LookupError::InvalidRequest(_)
            | LookupError::Fetch { .. }
            | LookupError::Parsing(_)
            | LookupError::Config(_)
            | LookupError::Io(_) => true,
        }
    }
}

/// Picks the source for a lookup: API first when available, scraper otherwise
pub struct SourceRouter {
    api: Option<Arc<dyn RecordSource>>,
    scrape: Arc<dyn RecordSource>,
    policy: FallbackPolicy,
}

impl SourceRouter {
    pub fn new(api: Option<Arc<dyn RecordSource>>, scrape: Arc<dyn RecordSource>, policy: FallbackPolicy) -> Self {
        Self { api, scrape, policy }
    }

    /// Scraper only
    pub fn scrape_only(scrape: Arc<dyn RecordSource>) -> Self {
        Self::new(None, scrape, FallbackPolicy::default())
    }

    pub fn has_api(&self) -> bool {
        self.api.is_some()
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }
}

#[async_trait]
impl RecordSource for SourceRouter {
    async fn lookup(&self, key: &str) -> Result<Record> {
        let api = match &self.api {
            Some(api) => api,
            None => return self.scrape.lookup(key).await,
        };

        match api.lookup(key).await {
            Ok(record) => Ok(record),
            Err(e) if self.policy.should_fall_back(&e) => {
                tracing::warn!(
                    "⚠️ {} failed for '{}', falling back to {}: {}",
                    api.name(),
                    key,
                    self.scrape.name(),
                    e
                );
                self.scrape.lookup(key).await
            }
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        "router"
    }
}
