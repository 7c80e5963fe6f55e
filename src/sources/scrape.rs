use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LookupConfig;
use crate::core::Record;
use crate::error::{LookupError, Result};
use crate::extract::{Decode, Extracted, FieldExtractor, FieldRule, PatternExtractor};
use crate::net::{construct_url, FetchClient, RateGate, RetryingFetcher};
use crate::sources::RecordSource;

pub const SOURCE_NAME: &str = "steamdb";

/// Phrases SteamDB shows on an empty search page (compared lowercase)
const NO_RESULTS_MARKERS: &[&str] = &["no results were found", "no apps were found", "class=\"no-results\""];

/// SteamDB scraper.
///
/// Two phases: the search listing gives identity (id, name, date), then the
/// app page fills in prices, score, description and tags. A failed app page
/// still returns the listing data.
pub struct ScrapeSource {
    base_url: String,
    gate: RateGate,
    fetcher: RetryingFetcher,
    listing: Box<dyn FieldExtractor>,
    detail: Box<dyn FieldExtractor>,
}

/// First app row of the listing, tag included so `data-appid` stays in scope
const FIRST_ROW: &str = r#"(?s)(<tr[^>]*data-appid="\d+"[^>]*>.*?</tr>)"#;

const ID_CELL: &str = r#"<td class="b">\s*(\d+)\s*</td>"#;

fn cell(class: &str) -> String {
    format!(r#"(?s)<td class="{}">(.*?)</td>"#, class)
}

/// Rules for the search listing. Fields come from the first app row; the
/// `page_` fields cover listings without `data-appid` rows.
pub fn listing_rules() -> Vec<FieldRule> {
    let mut rules = vec![
        FieldRule::first("id", ID_CELL).within(FIRST_ROW),
        FieldRule::first("id", r#"data-appid="(\d+)""#).within(FIRST_ROW),
        FieldRule::first("page_id", ID_CELL),
    ];

    for (prefix, scope) in [("", Some(FIRST_ROW)), ("page_", None)] {
        let fields = [
            // id and name share the cell class; the name is picked in listing_record
            FieldRule::all(format!("{}cells", prefix), cell("b")),
            FieldRule::first(format!("{}release_date", prefix), cell("date")),
            FieldRule::first(format!("{}current_price", prefix), cell("price")),
            FieldRule::first(format!("{}quality_score", prefix), cell("score")),
        ];
        for rule in fields {
            let rule = rule.decode(Decode::Html);
            rules.push(match scope {
                Some(scope) => rule.within(scope),
                None => rule,
            });
        }
    }
    rules
}

/// Rules for an app page
pub fn detail_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::first("name", r#"(?s)<h1[^>]*itemprop="name"[^>]*>(.*?)</h1>"#).decode(Decode::Html),
        FieldRule::first("name", r#"(?s)<h1[^>]*>(.*?)</h1>"#).decode(Decode::Html),
        FieldRule::first("current_price", r#"(?s)<td class="price">(.*?)</td>"#).decode(Decode::Html),
        FieldRule::first("lowest_price", r#"(?s)<td class="lowest-price">(.*?)</td>"#).decode(Decode::Html),
        FieldRule::first("quality_score", r#"(?s)<td class="score">(.*?)</td>"#).decode(Decode::Html),
        FieldRule::first("release_date", r#"(?s)<td class="date">(.*?)</td>"#).decode(Decode::Html),
        FieldRule::first("developer", r#"(?s)<td class="developer">(.*?)</td>"#).decode(Decode::Html),
        FieldRule::first("publisher", r#"(?s)<td class="publisher">(.*?)</td>"#).decode(Decode::Html),
        FieldRule::first("description", r#"(?s)<div class="description">(.*?)</div>"#).decode(Decode::Html),
        FieldRule::all("tags", r#"(?s)<a class="tag" href="[^"]*">(.*?)</a>"#).decode(Decode::Html),
    ]
}

impl ScrapeSource {
    /// Create the scraper with its own gate and fetcher
    pub fn new(config: &LookupConfig, client: Arc<dyn FetchClient>) -> Result<Self> {
        let listing = PatternExtractor::new(listing_rules())?;
        let detail = PatternExtractor::new(detail_rules())?;
        tracing::debug!(
            "SteamDB extractors ready (listing: {:?}, detail: {:?})",
            listing.fields().collect::<Vec<_>>(),
            detail.fields().collect::<Vec<_>>()
        );
        Ok(Self::with_extractors(config, client, Box::new(listing), Box::new(detail)))
    }

    /// Create with custom extractors (e.g. a real HTML parser)
    pub fn with_extractors(
        config: &LookupConfig,
        client: Arc<dyn FetchClient>,
        listing: Box<dyn FieldExtractor>,
        detail: Box<dyn FieldExtractor>,
    ) -> Self {
        Self {
            base_url: config.scrape_base_url.clone(),
            gate: RateGate::new(config.scrape_requests_per_minute),
            fetcher: RetryingFetcher::new(client, config.retry_policy()),
            listing,
            detail,
        }
    }

    pub fn search_url(&self, key: &str) -> String {
        construct_url(&format!("{}/search/?q=", self.base_url), key)
    }

    pub fn detail_url(&self, app_id: &str) -> String {
        format!("{}/app/{}/", self.base_url, app_id)
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        self.gate.wait_for_next().await;
        Ok(self.fetcher.fetch(url).await?.body)
    }

    fn listing_record(key: &str, listing: &Extracted) -> Record {
        let has_row = listing.has("id") || listing.has("cells");
        let field = |name: &str| {
            if has_row {
                listing.text(name)
            } else {
                listing.text(&format!("page_{}", name))
            }
        };

        let mut record = Record::new(key);
        record.source = SOURCE_NAME.to_string();
        record.canonical_id = field("id");
        let cells = if has_row { listing.all("cells") } else { listing.all("page_cells") };
        record.display_name = pick_name(cells, &record.canonical_id);
        record.release_date = field("release_date");
        record.current_price = field("current_price");
        record.quality_score = field("quality_score");
        record
    }
}

/// The first cell with a non-digit, else the first cell that is not the id
/// (all-digit titles such as "1943")
fn pick_name(cells: &[String], id: &str) -> String {
    cells
        .iter()
        .find(|cell| !cell.chars().all(|c| c.is_ascii_digit()))
        .or_else(|| cells.iter().find(|cell| cell.as_str() != id))
        .cloned()
        .unwrap_or_default()
}

/// Whether the page says the search matched nothing
fn is_no_results(body: &str) -> bool {
    let lower = body.to_lowercase();
    NO_RESULTS_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// Fill an empty field, or replace a vague one ("N/A") with a structured value ("$9.99")
fn merge_field(target: &mut String, candidate: &str) {
    if candidate.is_empty() {
        return;
    }
    if target.is_empty() || (!has_digit(target) && has_digit(candidate)) {
        *target = candidate.to_string();
    }
}

/// Merge app-page fields into a listing record
pub fn merge_detail(record: &mut Record, detail: &Extracted) {
    merge_field(&mut record.display_name, &detail.text("name"));
    merge_field(&mut record.current_price, &detail.text("current_price"));
    merge_field(&mut record.lowest_price, &detail.text("lowest_price"));
    merge_field(&mut record.quality_score, &detail.text("quality_score"));
    merge_field(&mut record.release_date, &detail.text("release_date"));
    merge_field(&mut record.developer, &detail.text("developer"));
    merge_field(&mut record.publisher, &detail.text("publisher"));
    merge_field(&mut record.description, &detail.text("description"));

    if record.tags.is_empty() {
        record.tags = detail.all("tags").to_vec();
    }
}

#[async_trait]
impl RecordSource for ScrapeSource {
    async fn lookup(&self, key: &str) -> Result<Record> {
        let search_url = self.search_url(key);
        let body = self.fetch(&search_url).await?;

        let listing = self.listing.extract(&body);
        let mut record = Self::listing_record(key, &listing);

        if !record.has_identity() {
            if is_no_results(&body) {
                return Err(LookupError::NotFound(format!("SteamDB has no results for '{}'", key)));
            }
            return Err(LookupError::Parsing(format!(
                "SteamDB listing for '{}' has no recognizable app rows",
                key
            )));
        }

        if record.canonical_id.is_empty() {
            tracing::info!("⚠️ SteamDB listing for '{}' has a name but no app id, skipping details", key);
            return Ok(record);
        }

        let detail_url = self.detail_url(&record.canonical_id);
        record.url = detail_url.clone();

        match self.fetch(&detail_url).await {
            Ok(page) => {
                let detail = self.detail.extract(&page);
                merge_detail(&mut record, &detail);
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ App page for {} failed, returning listing data only: {}",
                    record.canonical_id,
                    e
                );
            }
        }

        tracing::debug!("SteamDB resolved '{}' → {}", key, record.label());
        Ok(record)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}
