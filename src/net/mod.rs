pub mod rate_gate;
pub mod retry;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::{LookupError, Result};

pub use rate_gate::RateGate;
pub use retry::{Fetched, RetryPolicy, RetryingFetcher};

/// Single-shot page fetch, no retries, no throttling
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Fetch `url` and return the response body
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// reqwest-backed fetch client
pub struct HttpFetchClient {
    client: Client,
}

impl HttpFetchClient {
    /// Create new client with a transport timeout and user agent
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| LookupError::InvalidRequest(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FetchClient for HttpFetchClient {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| LookupError::from_reqwest(url, e))
    }
}

/// Percent-encode every byte except `A-Z a-z 0-9 - _ . ~`, uppercase hex
pub fn url_encode(text: &str) -> String {
    urlencoding::encode(text).into_owned()
}

/// Append an encoded query to a base URL
pub fn construct_url(base_url: &str, query: &str) -> String {
    format!("{}{}", base_url, url_encode(query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encode_round_trip() {
        for s in ["Half-Life 2", "Tom & Jerry", "Pokémon ✨", "a+b=c?d/e", ""] {
            let encoded = url_encode(s);
            assert_eq!(urlencoding::decode(&encoded).unwrap(), s);
        }
    }

    #[test]
    fn test_url_encode_format() {
        assert_eq!(url_encode("Half-Life 2"), "Half-Life%202");
        assert_eq!(url_encode("a&b"), "a%26b");
        assert_eq!(url_encode("é"), "%C3%A9");
        assert_eq!(url_encode("AZaz09-_.~"), "AZaz09-_.~");
        assert_eq!(url_encode("/"), "%2F");
    }

    #[test]
    fn test_construct_url() {
        assert_eq!(
            construct_url("https://steamdb.info/search/?q=", "dota 2"),
            "https://steamdb.info/search/?q=dota%202"
        );
    }

    #[test]
    fn test_http_client_builds() {
        assert!(HttpFetchClient::new(Duration::from_secs(1), "test-agent").is_ok());
    }
}
