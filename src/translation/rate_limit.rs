/*!
 * Minimum-interval rate limiting between provider calls.
 */

use std::time::Duration;

use log::debug;
use tokio::time::Instant;

/// Spaces consecutive provider calls at least `min_interval` apart
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Option<Duration>,
    last_call: Option<Instant>,
}

impl RateLimiter {
    /// Limiter enforcing `min_interval_ms` between calls; `None` disables it
    pub fn new(min_interval_ms: Option<u64>) -> Self {
        Self {
            min_interval: min_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            last_call: None,
        }
    }

    /// Limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Sleep until the interval since the previous call has elapsed, then
    /// record this call
    pub async fn wait(&mut self) {
        if let (Some(interval), Some(last)) = (self.min_interval, self.last_call) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                let remaining = interval - elapsed;
                debug!("Rate limiter waiting {} ms", remaining.as_millis());
                tokio::time::sleep(remaining).await;
            }
        }
        self.last_call = Some(Instant::now());
    }
}
