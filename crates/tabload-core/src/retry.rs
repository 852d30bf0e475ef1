//! Retry and pacing policies for the submission loop.
//!
//! Both are injected into the loader rather than hard-coded so tests
//! can run with zero delay and an effectively unlimited rate.

use std::time::Duration;

use tokio::time::Instant;

/// Fixed-delay retry policy for one chunk submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, delay: Duration::from_secs(2) }
    }
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), delay }
    }

    /// Same attempt budget, no inter-attempt sleeping. For tests.
    pub fn no_delay(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Token-bucket rate limiter parameterized by requests per second.
///
/// The conservative default (1 request/second, burst of 1) matches
/// the effective pace the remote store is known to tolerate. This is
/// still blunt backpressure: the bucket never learns from remote
/// throttling responses.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64, burst: f64) -> Self {
        let rate = if requests_per_second > 0.0 { requests_per_second } else { 1.0 };
        let capacity = burst.max(1.0);
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec: rate,
            last_refill: Instant::now(),
        }
    }

    /// Single-token burst at the given rate.
    pub fn per_second(requests_per_second: f64) -> Self {
        Self::new(requests_per_second, 1.0)
    }

    /// Take one token, sleeping until the bucket refills if empty.
    pub async fn acquire(&mut self) {
        loop {
            self.refill();
            if self.tokens >= 1.0 {
                self.tokens -= 1.0;
                return;
            }
            let deficit = (1.0 - self.tokens) / self.refill_per_sec;
            tokio::time::sleep(Duration::from_secs_f64(deficit)).await;
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }
}
