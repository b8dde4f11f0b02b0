use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

/// Spaces out consecutive requests to one API
#[derive(Debug)]
pub struct RateLimiter {
    last_request_time: Option<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified rate (requests per second)
    #[must_use]
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::from_millis((1000.0 / requests_per_second) as u64)
        } else {
            Duration::from_secs(1)
        };

        debug!(
            "Created rate limiter: {} requests per second",
            requests_per_second
        );

        Self::with_interval(min_interval)
    }

    /// Create a rate limiter that keeps `min_interval` between requests
    #[must_use]
    pub const fn with_interval(min_interval: Duration) -> Self {
        Self {
            last_request_time: None,
            min_interval,
        }
    }

    /// Wait until it's safe to make a request (respects rate limit)
    pub async fn acquire(&mut self) {
        if let Some(wait_time) = self.time_until_ready() {
            debug!("Rate limiter: waiting {}ms", wait_time.as_millis());
            sleep(wait_time).await;
        }

        self.last_request_time = Some(Instant::now());
    }

    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Get time until next request is allowed
    #[must_use]
    pub fn time_until_ready(&self) -> Option<Duration> {
        self.last_request_time.and_then(|last_time| {
            let elapsed = Instant::now().duration_since(last_time);
            if elapsed >= self.min_interval {
                None
            } else {
                Some(self.min_interval - elapsed)
            }
        })
    }
}
