//! Per-client inbound rate limiting (§4.8): a configurable per-minute
//! window, default 600. Exceeding it surfaces as `Error::RateLimited` and
//! closes the connection (§7).

use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

pub struct RateLimiter {
    limit: u32,
    window_start: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        RateLimiter { limit: limit_per_minute, window_start: Instant::now(), count: 0 }
    }

    /// Records one inbound message and reports whether the client is over
    /// its per-minute budget. The window resets wall-clock, not per-message,
    /// so a burst right at the boundary can momentarily double the rate;
    /// acceptable since the limit exists to catch runaway clients, not to
    /// meter them precisely.
    pub fn record(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.window_start) >= WINDOW {
            self.window_start = now;
            self.count = 0;
        }
        self.count += 1;
        self.count <= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let mut limiter = RateLimiter::new(3);
        assert!(limiter.record());
        assert!(limiter.record());
        assert!(limiter.record());
        assert!(!limiter.record());
    }
}
