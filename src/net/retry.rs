use std::sync::Arc;
use std::time::Duration;

use crate::error::{LookupError, Result};
use crate::net::FetchClient;

/// Exponential backoff settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Sleep before the first retry
    pub base_delay: Duration,
    /// Factor applied to the delay after every failed attempt
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            multiplier: 2.0,
        }
    }
}

/// Upper bound on a single backoff sleep
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

/// Next backoff delay, saturating at [`MAX_RETRY_DELAY`]. A multiplier below
/// 1 (or NaN) keeps the delay as it is.
pub fn next_delay(delay: Duration, multiplier: f64) -> Duration {
    if multiplier.is_nan() || multiplier < 1.0 {
        return delay;
    }
    Duration::try_from_secs_f64(delay.as_secs_f64() * multiplier)
        .unwrap_or(MAX_RETRY_DELAY)
        .min(MAX_RETRY_DELAY)
}

/// Successful fetch plus the number of retries it took
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: String,
    pub retries: u32,
}

/// Retries transient failures of a [`FetchClient`] with exponential backoff.
///
/// Permanent failures (4xx, malformed requests) come back on the first
/// attempt, unwrapped.
pub struct RetryingFetcher {
    client: Arc<dyn FetchClient>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(client: Arc<dyn FetchClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch `url`, retrying transient errors until the policy is exhausted
    pub async fn fetch(&self, url: &str) -> Result<Fetched> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt: u32 = 0;
        let mut delay = self.policy.base_delay;

        loop {
            match self.client.fetch(url).await {
                Ok(body) => {
                    if attempt > 0 {
                        tracing::debug!("✅ {} succeeded after {} retries", url, attempt);
                    }
                    return Ok(Fetched { body, retries: attempt });
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt + 1 >= max_attempts => {
                    tracing::error!("❌ Giving up on {} after {} attempts: {}", url, attempt + 1, e);
                    return Err(LookupError::Fetch {
                        attempts: attempt + 1,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    attempt += 1;
                    tracing::warn!(
                        "🔁 Retry attempt {} for {} in {:?}: {}",
                        attempt,
                        url,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay = next_delay(delay, self.policy.multiplier);
                }
            }
        }
    }
}
