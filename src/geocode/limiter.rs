//! Minimum-interval rate limiter
//!
//! The upstream geocoder's usage policy caps clients at roughly one request
//! per second. The limiter enforces that as a minimum spacing between
//! consecutive `acquire` calls, decoupled from the fetch pipeline so the
//! policy is testable on its own.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct MinIntervalLimiter {
    min_interval: Duration,
    next_allowed: Option<Instant>,
}

impl MinIntervalLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until at least `min_interval` has passed since the previous
    /// acquire. The first acquire proceeds immediately. The interval is a
    /// floor, not a cap: callers may take longer between acquires.
    pub async fn acquire(&mut self) {
        if let Some(next) = self.next_allowed {
            if next > Instant::now() {
                sleep_until(next).await;
            }
        }
        self.next_allowed = Some(Instant::now() + self.min_interval);
    }
}
