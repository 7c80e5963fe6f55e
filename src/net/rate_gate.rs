use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::DEFAULT_REQUESTS_PER_MINUTE;

/// Minimum spacing between calls to one upstream.
///
/// The lock is held while waiting, so callers are admitted one at a time in
/// the order they arrived.
pub struct RateGate {
    last: Mutex<Option<Instant>>,
    min_interval: Duration,
    requests_per_minute: u32,
}

impl RateGate {
    /// Create a gate allowing `requests_per_minute` calls, evenly spaced
    pub fn new(requests_per_minute: u32) -> Self {
        let requests_per_minute = if requests_per_minute == 0 {
            tracing::warn!(
                "⚠️ Rate budget of 0 req/min is invalid, using {}",
                DEFAULT_REQUESTS_PER_MINUTE
            );
            DEFAULT_REQUESTS_PER_MINUTE
        } else {
            requests_per_minute
        };

        Self {
            last: Mutex::new(None),
            min_interval: Duration::from_millis(60_000 / u64::from(requests_per_minute)),
            requests_per_minute,
        }
    }

    /// Wait until `min_interval` has passed since the previous permitted call
    pub async fn wait_for_next(&self) {
        let mut last = self.last.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if Instant::now() < ready_at {
                tracing::trace!("Rate gate sleeping {:?}", ready_at - Instant::now());
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }
}
