pub mod api;
pub mod catalog;
pub mod router;
pub mod scrape;

use async_trait::async_trait;
use crate::core::Record;
use crate::error::Result;

pub use api::{ApiSource, SaleInfo};
pub use router::{FallbackPolicy, SourceRouter};
pub use scrape::ScrapeSource;

/// Trait for upstream game data sources (Steam store API, SteamDB)
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Look up one game by title or numeric app id
    async fn lookup(&self, key: &str) -> Result<Record>;

    /// Get source name
    fn name(&self) -> &str;
}
