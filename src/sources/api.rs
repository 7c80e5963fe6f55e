use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::config::LookupConfig;
use crate::core::Record;
use crate::error::{LookupError, Result};
use crate::extract::{Decode, Extracted, FieldExtractor, FieldRule, PatternExtractor};
use crate::net::{url_encode, FetchClient, RateGate, RetryingFetcher};
use crate::sources::catalog;
use crate::sources::RecordSource;

pub const SOURCE_NAME: &str = "steam_api";

/// Valve's public account, used only to validate the API key
const CHECK_STEAM_ID: &str = "76561197960435530";

const STORE_PAGE_URL: &str = "https://store.steampowered.com/app";

const DEFAULT_COUNTRY: &str = "US";

/// Discount at which a sale is highlighted
pub const HIGHLIGHT_DISCOUNT: u32 = 25;

/// Popular apps polled by [`ApiSource::current_sales`]
pub const SALE_WATCHLIST: [&str; 10] = [
    "292030",  // The Witcher 3
    "1091500", // Cyberpunk 2077
    "271590",  // GTA V
    "1245620", // Elden Ring
    "397540",  // Borderlands 3
    "632470",  // Disco Elysium
    "1174180", // Red Dead Redemption 2
    "1593500", // God of War
    "1449850", // Yu-Gi-Oh! Master Duel
    "346110",  // ARK: Survival Evolved
];

/// A quoted JSON string body, escapes included
const JSON_STR: &str = r#""((?:[^"\\]|\\.)*)""#;

fn string_field(key: &str) -> String {
    format!(r#""{}"\s*:\s*{}"#, key, JSON_STR)
}

fn object_scope(key: &str) -> String {
    format!(r#"(?s)"{}"\s*:\s*\{{(.*?)\}}"#, key)
}

fn array_scope(key: &str) -> String {
    format!(r#"(?s)"{}"\s*:\s*\[(.*?)\]"#, key)
}

/// Rules for a store `appdetails` payload
pub fn appdetails_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::first("success_false", r#""success"\s*:\s*false"#),
        FieldRule::first("steam_appid", r#""steam_appid"\s*:\s*(\d+)"#),
        FieldRule::first("name", string_field("name")).decode(Decode::JsonString),
        FieldRule::first("description", string_field("short_description")).decode(Decode::JsonString),
        FieldRule::first("developer", JSON_STR)
            .within(array_scope("developers"))
            .decode(Decode::JsonString),
        FieldRule::first("publisher", JSON_STR)
            .within(array_scope("publishers"))
            .decode(Decode::JsonString),
        FieldRule::first("release_date", string_field("date"))
            .within(object_scope("release_date"))
            .decode(Decode::JsonString),
        FieldRule::first("header_image", string_field("header_image")).decode(Decode::JsonString),
        FieldRule::first("quality_score", r#""score"\s*:\s*(\d+)"#).within(object_scope("metacritic")),
        FieldRule::first("is_free", r#""is_free"\s*:\s*(true|false)"#),
        FieldRule::first("current_price", string_field("final_formatted"))
            .within(object_scope("price_overview"))
            .decode(Decode::JsonString),
        FieldRule::first("original_price", string_field("initial_formatted"))
            .within(object_scope("price_overview"))
            .decode(Decode::JsonString),
        FieldRule::first("discount_percent", r#""discount_percent"\s*:\s*(\d+)"#)
            .within(object_scope("price_overview")),
        FieldRule::first("currency", string_field("currency"))
            .within(object_scope("price_overview"))
            .decode(Decode::JsonString),
        FieldRule::all("tags", string_field("description"))
            .within(array_scope("genres"))
            .decode(Decode::JsonString),
    ]
}

/// Whether a key is a Steam app id rather than a title
pub fn is_app_id(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_digit())
}

/// Pricing snapshot of one app
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaleInfo {
    pub app_id: String,
    pub name: String,
    pub current_price: String,
    /// Same as `current_price` when not discounted
    pub original_price: String,
    /// Empty unless discounted
    pub discount_percent: String,
    pub currency: String,
    pub header_image: String,
    pub is_on_sale: bool,
    /// Discount of at least [`HIGHLIGHT_DISCOUNT`] percent
    pub is_highlighted: bool,
}

impl SaleInfo {
    pub fn from_record(record: &Record) -> Self {
        let mut info = SaleInfo {
            app_id: record.canonical_id.clone(),
            name: record.display_name.clone(),
            currency: record.currency.clone(),
            header_image: record.header_image.clone(),
            ..SaleInfo::default()
        };

        if record.is_free {
            info.current_price = "Free to Play".to_string();
            info.original_price = info.current_price.clone();
            return info;
        }

        info.current_price = record.current_price.clone();
        if record.is_on_sale {
            info.original_price = record.original_price.clone();
            info.discount_percent = record.discount_percent.clone();
            info.is_on_sale = true;
            info.is_highlighted = record
                .discount_percent
                .parse::<u32>()
                .is_ok_and(|pct| pct >= HIGHLIGHT_DISCOUNT);
        } else if record.original_price.is_empty() {
            info.original_price = record.current_price.clone();
        } else {
            info.original_price = record.original_price.clone();
        }
        info
    }
}

fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Steam store API source.
///
/// Requires a validated Web API key. Numeric keys hit `appdetails`
/// directly; titles are resolved through the local name table first.
pub struct ApiSource {
    api_base_url: String,
    store_api_base_url: String,
    api_key: String,
    gate: RateGate,
    fetcher: RetryingFetcher,
    extractor: Box<dyn FieldExtractor>,
}

impl ApiSource {
    /// Create without probing the key. Fails with `Auth` if no key is configured.
    pub fn new(config: &LookupConfig, client: Arc<dyn FetchClient>) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LookupError::Auth("no STEAM_API_KEY configured".to_string()))?;

        Ok(Self {
            api_base_url: config.api_base_url.clone(),
            store_api_base_url: config.store_api_base_url.clone(),
            api_key,
            gate: RateGate::new(config.api_requests_per_minute),
            fetcher: RetryingFetcher::new(client, config.retry_policy()),
            extractor: Box::new(PatternExtractor::new(appdetails_rules())?),
        })
    }

    /// Create and validate the key once
    pub async fn connect(config: &LookupConfig, client: Arc<dyn FetchClient>) -> Result<Self> {
        let source = Self::new(config, client)?;
        source.validate().await?;
        tracing::info!("✅ Steam API key validated");
        Ok(source)
    }

    /// Check the configured key against the Web API
    pub async fn validate(&self) -> Result<()> {
        let url = format!(
            "{}/ISteamUser/GetPlayerSummaries/v0002/?key={}&steamids={}",
            self.api_base_url,
            url_encode(&self.api_key),
            CHECK_STEAM_ID
        );

        self.gate.wait_for_next().await;
        match self.fetcher.fetch(&url).await {
            Ok(fetched) if !fetched.body.trim().is_empty() && !fetched.body.contains("Invalid API Key") => Ok(()),
            Ok(_) => Err(LookupError::Auth("Steam API key was rejected".to_string())),
            Err(e) => Err(LookupError::Auth(format!("Steam API key check failed: {}", e))),
        }
    }

    pub fn appdetails_url(&self, app_id: &str) -> String {
        self.appdetails_url_in(app_id, DEFAULT_COUNTRY)
    }

    /// `appdetails` URL with prices in `country_code`'s store currency
    pub fn appdetails_url_in(&self, app_id: &str, country_code: &str) -> String {
        format!(
            "{}/appdetails?appids={}&cc={}&l=en",
            self.store_api_base_url, app_id, country_code
        )
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        self.gate.wait_for_next().await;
        match self.fetcher.fetch(url).await {
            Ok(fetched) => Ok(fetched.body),
            Err(LookupError::Status { status: status @ (401 | 403), .. }) => Err(LookupError::Auth(
                format!("Steam API refused the request (HTTP {})", status),
            )),
            Err(e) => Err(e),
        }
    }

    /// Fetch and normalize one app
    pub async fn details(&self, key: &str, app_id: &str) -> Result<Record> {
        self.details_in(key, app_id, DEFAULT_COUNTRY).await
    }

    async fn details_in(&self, key: &str, app_id: &str, country_code: &str) -> Result<Record> {
        let body = self.fetch(&self.appdetails_url_in(app_id, country_code)).await?;
        let fields = self.extractor.extract(&body);

        if fields.has("success_false") {
            return Err(LookupError::NotFound(format!("Steam has no app {}", app_id)));
        }
        if !fields.has("name") {
            return Err(LookupError::Parsing(format!(
                "appdetails for {} has no name field",
                app_id
            )));
        }

        Ok(Self::to_record(key, app_id, &fields))
    }

    fn to_record(key: &str, app_id: &str, fields: &Extracted) -> Record {
        let mut record = Record::new(key);
        record.source = SOURCE_NAME.to_string();
        record.canonical_id = fields.first("steam_appid").unwrap_or(app_id).to_string();
        record.display_name = fields.text("name");
        record.description = fields.text("description");
        record.developer = fields.text("developer");
        record.publisher = fields.text("publisher");
        record.release_date = fields.text("release_date");
        record.header_image = fields.text("header_image");
        record.quality_score = fields.text("quality_score");
        record.tags = fields.all("tags").to_vec();
        record.url = format!("{}/{}", STORE_PAGE_URL, record.canonical_id);
        record.is_free = fields.first("is_free") == Some("true");

        if !record.is_free {
            record.current_price = fields.text("current_price");
            record.original_price = fields.text("original_price");
            record.discount_percent = fields.text("discount_percent");
            record.currency = fields.text("currency");
            record.is_on_sale = !record.discount_percent.is_empty() && record.discount_percent != "0";
        }

        record
    }

    /// Detail calls for the resolved candidates, in rank order.
    /// Stops at the first success when `first_only`, or after an exact-name hit.
    async fn resolve_and_fetch(&self, key: &str, first_only: bool) -> Result<Vec<Record>> {
        let candidates = catalog::resolve(key);
        if candidates.is_empty() {
            return Err(LookupError::NotFound(format!("'{}' is not in the Steam name table", key)));
        }
        tracing::debug!("Resolved '{}' to {} candidate(s)", key, candidates.len());

        let mut records = Vec::new();
        let mut hard_failure = None;

        for (i, entry) in candidates.iter().enumerate() {
            match self.details(key, entry.app_id).await {
                Ok(record) => {
                    let exact_hit = i == 0 && candidates.exact.is_some();
                    records.push(record);
                    if first_only || exact_hit {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("⚠️ Details for {} ({}) failed: {}", entry.name, entry.app_id, e);
                    if !matches!(e, LookupError::NotFound(_) | LookupError::Parsing(_)) {
                        hard_failure = Some(e);
                    }
                }
            }
        }

        if records.is_empty() {
            return Err(hard_failure.unwrap_or_else(|| {
                LookupError::NotFound(format!("no Steam app matched '{}'", key))
            }));
        }
        Ok(records)
    }

    /// Price of one app in a country's store (`"US"`, `"fr"`, ...)
    pub async fn price(&self, app_id: &str, country_code: &str) -> Result<SaleInfo> {
        if !is_app_id(app_id) {
            return Err(LookupError::InvalidInput(format!("'{}' is not a Steam app id", app_id)));
        }
        if !is_country_code(country_code) {
            return Err(LookupError::InvalidInput(format!(
                "'{}' is not a two-letter country code",
                country_code
            )));
        }

        let record = self
            .details_in(app_id, app_id, &country_code.to_ascii_uppercase())
            .await?;
        Ok(SaleInfo::from_record(&record))
    }

    /// Price in the US store
    pub async fn sale_info(&self, app_id: &str) -> Result<SaleInfo> {
        self.price(app_id, DEFAULT_COUNTRY).await
    }

    pub async fn is_on_sale(&self, app_id: &str) -> Result<bool> {
        Ok(self.sale_info(app_id).await?.is_on_sale)
    }

    /// Current prices of [`SALE_WATCHLIST`] apps, at most `limit`.
    /// Apps that fail to load are skipped.
    pub async fn current_sales(&self, limit: usize) -> Vec<SaleInfo> {
        let mut sales = Vec::new();
        for app_id in SALE_WATCHLIST {
            if sales.len() >= limit {
                break;
            }
            match self.sale_info(app_id).await {
                Ok(info) => sales.push(info),
                Err(e) => tracing::warn!("⚠️ Skipping sale info for {}: {}", app_id, e),
            }
        }
        tracing::debug!("Collected {} sale entries", sales.len());
        sales
    }

    /// Every record the name table yields for `key`
    pub async fn search(&self, key: &str) -> Result<Vec<Record>> {
        if is_app_id(key) {
            return Ok(vec![self.details(key, key).await?]);
        }
        self.resolve_and_fetch(key, false).await
    }
}

#[async_trait]
impl RecordSource for ApiSource {
    async fn lookup(&self, key: &str) -> Result<Record> {
        if is_app_id(key) {
            return self.details(key, key).await;
        }

        self.resolve_and_fetch(key, true)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NotFound(format!("no Steam app matched '{}'", key)))
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}
