use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::cache::{CacheStats, RecordCache};
use crate::config::LookupConfig;
use crate::core::{LookupResponse, Record};
use crate::error::{LookupError, Result};
use crate::net::{FetchClient, HttpFetchClient};
use crate::sources::{ApiSource, FallbackPolicy, RecordSource, ScrapeSource, SourceRouter};

type FlightSlot = Arc<tokio::sync::Mutex<()>>;

/// Per-key async locks so concurrent misses for one key fetch once.
/// Each entry counts the lookups holding or waiting on it.
#[derive(Default)]
struct InFlight {
    slots: Mutex<HashMap<String, (FlightSlot, usize)>>,
}

impl InFlight {
    fn lock_table(&self) -> MutexGuard<'_, HashMap<String, (FlightSlot, usize)>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join<'a>(&'a self, key: &'a str) -> Flight<'a> {
        let mut slots = self.lock_table();
        let (slot, users) = slots.entry(key.to_string()).or_default();
        *users += 1;
        Flight {
            in_flight: self,
            key,
            slot: slot.clone(),
        }
    }

    fn leave(&self, key: &str) {
        let mut slots = self.lock_table();
        if let Some((_, users)) = slots.get_mut(key) {
            *users -= 1;
            if *users == 0 {
                slots.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock_table().len()
    }
}

/// One lookup's membership in an [`InFlight`] entry. Leaves on drop, so a
/// cancelled lookup does not strand its entry.
struct Flight<'a> {
    in_flight: &'a InFlight,
    key: &'a str,
    slot: FlightSlot,
}

impl Flight<'_> {
    async fn lock(&self) -> tokio::sync::OwnedMutexGuard<()> {
        self.slot.clone().lock_owned().await
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.in_flight.leave(self.key);
    }
}

/// Cache-first game lookup.
///
/// A hit is served from [`RecordCache`]; a miss goes through the
/// [`SourceRouter`] and successful records are cached. Errors are returned
/// untouched and never cached.
pub struct LookupService {
    router: SourceRouter,
    cache: Arc<RecordCache>,
    single_flight: bool,
    in_flight: InFlight,
}

impl LookupService {
    /// Build the HTTP stack from `config`. A missing or rejected API key
    /// leaves the service running on the scraper alone.
    pub async fn from_config(config: LookupConfig) -> Result<Self> {
        LookupServiceBuilder::new(config).build().await
    }

    pub fn builder(config: LookupConfig) -> LookupServiceBuilder {
        LookupServiceBuilder::new(config)
    }

    /// Look up one game by title or app id
    pub async fn lookup(&self, key: &str) -> Result<Record> {
        Ok(self.lookup_detailed(key).await?.record)
    }

    /// Like [`lookup`](Self::lookup), with cache and latency metadata
    pub async fn lookup_detailed(&self, key: &str) -> Result<LookupResponse> {
        let start = Instant::now();
        let key = key.trim();
        if key.is_empty() {
            return Err(LookupError::InvalidInput("lookup key is empty".to_string()));
        }

        if self.cache.has(key) {
            if let Ok(record) = self.cache.get(key) {
                tracing::info!("✅ Cache hit: {}", key);
                return Ok(LookupResponse::cached(record, elapsed_ms(start)));
            }
            // cleared between has() and get()
        }
        tracing::debug!("Cache miss: {}", key);

        if !self.single_flight {
            return self.fetch_and_store(key, start).await;
        }

        let flight = self.in_flight.join(key);
        let _guard = flight.lock().await;
        match self.recheck(key) {
            Some(record) => Ok(LookupResponse::cached(record, elapsed_ms(start))),
            None => self.fetch_and_store(key, start).await,
        }
    }

    /// Cache lookup after waiting on another lookup of the same key.
    /// Absence here is not counted as a second miss.
    fn recheck(&self, key: &str) -> Option<Record> {
        self.cache.entry(key)?;
        let record = self.cache.get(key).ok()?;
        tracing::debug!("Served '{}' from a concurrent lookup", key);
        Some(record)
    }

    async fn fetch_and_store(&self, key: &str, start: Instant) -> Result<LookupResponse> {
        match self.router.lookup(key).await {
            Ok(record) => {
                self.cache.put(key, record.clone());
                let response = LookupResponse::fetched(record, elapsed_ms(start));
                tracing::info!("✅ {}", response.display());
                Ok(response)
            }
            Err(e) => {
                tracing::error!("❌ Lookup failed for '{}': {}", key, e);
                Err(e)
            }
        }
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    /// Whether the Steam API source is wired in
    pub fn has_api(&self) -> bool {
        self.router.has_api()
    }

    pub fn single_flight(&self) -> bool {
        self.single_flight
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Assembles a [`LookupService`], with optional injected parts
pub struct LookupServiceBuilder {
    config: LookupConfig,
    client: Option<Arc<dyn FetchClient>>,
    api: Option<Arc<dyn RecordSource>>,
    scrape: Option<Arc<dyn RecordSource>>,
    cache: Option<Arc<RecordCache>>,
}

impl LookupServiceBuilder {
    pub fn new(config: LookupConfig) -> Self {
        Self {
            config,
            client: None,
            api: None,
            scrape: None,
            cache: None,
        }
    }

    /// Transport shared by both sources (defaults to reqwest)
    pub fn client(mut self, client: Arc<dyn FetchClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Use this API source instead of connecting one
    pub fn api_source(mut self, source: Arc<dyn RecordSource>) -> Self {
        self.api = Some(source);
        self
    }

    pub fn scrape_source(mut self, source: Arc<dyn RecordSource>) -> Self {
        self.scrape = Some(source);
        self
    }

    /// Share an existing cache
    pub fn cache(mut self, cache: Arc<RecordCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn build(self) -> Result<LookupService> {
        let config = self.config;
        let client: Arc<dyn FetchClient> = match self.client {
            Some(client) => client,
            None => Arc::new(HttpFetchClient::new(config.request_timeout(), &config.user_agent)?),
        };

        let scrape: Arc<dyn RecordSource> = match self.scrape {
            Some(scrape) => scrape,
            None => Arc::new(ScrapeSource::new(&config, client.clone())?),
        };

        let api: Option<Arc<dyn RecordSource>> = match self.api {
            Some(api) => Some(api),
            None if !config.has_api_key() => {
                tracing::info!("No STEAM_API_KEY configured, using SteamDB only");
                None
            }
            None => match ApiSource::connect(&config, client.clone()).await {
                Ok(api) => Some(Arc::new(api)),
                Err(e) => {
                    tracing::warn!("⚠️ Steam API unavailable, using SteamDB only: {}", e);
                    None
                }
            },
        };

        let router = SourceRouter::new(api, scrape, FallbackPolicy::from_config(&config));

        Ok(LookupService {
            router,
            cache: self.cache.unwrap_or_default(),
            single_flight: config.single_flight,
            in_flight: InFlight::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::testing::{fast_config, ScriptedClient, FREE_APP_98, HL2_DETAIL, HL2_LISTING, NO_RESULTS_PAGE};

    async fn service(config: LookupConfig, client: ScriptedClient) -> (LookupService, Arc<ScriptedClient>) {
        let client = Arc::new(client);
        let service = LookupService::builder(config).client(client.clone()).build().await.unwrap();
        (service, client)
    }

    fn steamdb_hl2() -> ScriptedClient {
        ScriptedClient::new()
            .route("/search/?q=", HL2_LISTING)
            .route("/app/220/", HL2_DETAIL)
    }

    #[tokio::test]
    async fn test_scrape_lookup_without_api() {
        let (service, _) = service(fast_config(), steamdb_hl2()).await;
        assert!(!service.has_api());

        let record = service.lookup("Half-Life 2").await.unwrap();

        assert_eq!(record.canonical_id, "220");
        assert_eq!(record.display_name, "Half-Life 2");
        assert_eq!(record.current_price, "$9.99");
        assert_eq!(record.source, "steamdb");
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let (service, client) = service(fast_config(), steamdb_hl2()).await;

        let first = service.lookup("Half-Life 2").await.unwrap();
        assert!(service.cache().has("Half-Life 2"));
        let calls = client.call_count();

        let second = service.lookup_detailed("Half-Life 2").await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.source, "cache");
        assert_eq!(second.record, first);
        assert_eq!(client.call_count(), calls);
        assert_eq!(service.cache_stats().total_hits, 1);
    }

    #[tokio::test]
    async fn test_keys_are_trimmed() {
        let (service, client) = service(fast_config(), steamdb_hl2()).await;

        service.lookup("  Half-Life 2 ").await.unwrap();
        let calls = client.call_count();
        let record = service.lookup("Half-Life 2").await.unwrap();

        assert_eq!(record.key, "Half-Life 2");
        assert_eq!(client.call_count(), calls);
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let (service, client) = service(fast_config(), steamdb_hl2()).await;

        let err = service.lookup("   ").await.unwrap_err();
        assert!(matches!(err, LookupError::InvalidInput(_)));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_free_app_via_api() {
        let client = ScriptedClient::new()
            .route("GetPlayerSummaries", r#"{"response":{"players":[]}}"#)
            .route("appids=98&", FREE_APP_98);
        let (service, _) = service(fast_config().with_api_key("TESTKEY"), client).await;
        assert!(service.has_api());

        let record = service.lookup("98").await.unwrap();

        assert!(record.is_free);
        assert!(record.current_price.is_empty());
        assert!(!record.is_on_sale);
        assert_eq!(record.source, "steam_api");
    }

    #[tokio::test]
    async fn test_rejected_key_runs_scrape_only() {
        let client = steamdb_hl2().route_status("GetPlayerSummaries", 403);
        let (service, _) = service(fast_config().with_api_key("BAD"), client).await;

        assert!(!service.has_api());
        assert_eq!(service.lookup("Half-Life 2").await.unwrap().source, "steamdb");
    }

    #[tokio::test]
    async fn test_title_outside_name_table_is_not_scraped_by_default() {
        let client = steamdb_hl2().route("GetPlayerSummaries", r#"{"response":{"players":[]}}"#);
        let (service, client) = service(fast_config().with_api_key("TESTKEY"), client).await;
        assert_eq!(service.router.policy(), FallbackPolicy::TrustApiNotFound);

        let err = service.lookup("zzz-unlisted-title").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(client.calls_matching("steamdb.test"), 0);
        assert_eq!(client.calls_matching("appdetails"), 0);
    }

    #[tokio::test]
    async fn test_title_outside_name_table_is_scraped_when_fallback_enabled() {
        let client = steamdb_hl2().route("GetPlayerSummaries", r#"{"response":{"players":[]}}"#);
        let mut config = fast_config().with_api_key("TESTKEY");
        config.fallback_on_api_not_found = true;
        let (service, client) = service(config, client).await;
        assert_eq!(service.router.policy(), FallbackPolicy::AlwaysScrape);

        let record = service.lookup("zzz-unlisted-title").await.unwrap();

        assert_eq!(record.source, "steamdb");
        assert_eq!(client.calls_matching("/search/?q=zzz-unlisted-title"), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let client = ScriptedClient::new().route("/search/?q=", NO_RESULTS_PAGE);
        let (service, _) = service(fast_config(), client).await;

        let err = service.lookup("zzz-nonexistent-zzz").await.unwrap_err();

        assert!(err.is_not_found());
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let client = ScriptedClient::new().route_down("steamdb.test");
        let (service, client) = service(fast_config(), client).await;

        let err = service.lookup("Half-Life 2").await.unwrap_err();
        assert!(err.is_network());
        assert!(service.cache().is_empty());

        // the next attempt goes upstream again
        let before = client.call_count();
        assert!(service.lookup("Half-Life 2").await.is_err());
        assert!(client.call_count() > before);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_fetch_once() {
        let (service, client) = service(fast_config(), steamdb_hl2()).await;
        assert!(service.single_flight());

        let (a, b) = tokio::join!(service.lookup_detailed("Half-Life 2"), service.lookup_detailed("Half-Life 2"));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.record, b.record);
        assert!(a.from_cache || b.from_cache);
        assert_eq!(client.calls_matching("/search/?q="), 1);
        assert_eq!(service.in_flight.len(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_lookups_release_flight_slots() {
        let client = ScriptedClient::new().route_hang("steamdb.test");
        let (service, client) = service(fast_config(), client).await;

        let pending = tokio::time::timeout(
            Duration::from_millis(50),
            async { tokio::join!(service.lookup("Portal"), service.lookup("Portal"), service.lookup("Dota 2")) },
        )
        .await;

        assert!(pending.is_err());
        assert_eq!(client.calls_matching("/search/?q="), 2);
        assert_eq!(service.in_flight.len(), 0);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let (service, client) = service(fast_config(), steamdb_hl2()).await;

        service.lookup("Half-Life 2").await.unwrap();
        service.clear_cache();
        assert!(service.cache().is_empty());

        service.lookup("Half-Life 2").await.unwrap();
        assert_eq!(client.calls_matching("/search/?q="), 2);
    }
}
