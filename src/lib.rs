//! # KissBot Game Lookup
//!
//! Game metadata lookup over two upstreams:
//! - Steam store API (needs a Web API key)
//! - SteamDB pages, scraped, as the fallback
//!
//! Both are rate limited and retried. Successful lookups are kept in an
//! in-process cache for the lifetime of the service.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use kissbot_game_lookup::{LookupConfig, LookupService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LookupConfig::load("config.txt")?;
//!     let service = LookupService::from_config(config).await?;
//!
//!     let record = service.lookup("Half-Life 2").await?;
//!     println!("{} - {}", record.display_name, record.current_price);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod extract;
pub mod history;
pub mod logging;
pub mod net;
pub mod ranking;
pub mod service;
pub mod sources;

#[cfg(test)]
pub(crate) mod testing;

// Re-export primary types
pub use cache::{CacheStats, RecordCache};
pub use config::LookupConfig;
pub use core::{LookupResponse, Record};
pub use error::{LookupError, Result};
pub use net::{FetchClient, HttpFetchClient};
pub use service::{LookupService, LookupServiceBuilder};
pub use sources::{ApiSource, FallbackPolicy, RecordSource, SaleInfo, ScrapeSource, SourceRouter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
