use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Per-adapter throttle and retry policy (§4.4). One instance is owned by
/// each `BaseAdapter`; `r` and `m` are fixed for the adapter's lifetime.
pub struct RateLimiter {
    min_interval: Duration,
    max_retries: u32,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64, max_retries: u32) -> Self {
        let min_interval = Duration::from_secs_f64(1.0 / requests_per_second.max(0.001));
        RateLimiter {
            min_interval,
            max_retries,
            last_request: Mutex::new(None),
        }
    }

    /// Enforces a single non-negative inter-request gap against the last
    /// request's timestamp. Concurrent callers serialize on the mutex so
    /// the update itself cannot race.
    pub async fn throttle(&self) {
        let mut last_request = self.last_request.lock().await;
        let now = Instant::now();
        if let Some(previous) = *last_request {
            let elapsed = now.duration_since(previous);
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last_request = Some(Instant::now());
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Capped exponential backoff starting at one second, used between
    /// retries of a transient (5xx or network) failure. `attempt` is
    /// 1-based: the delay before the first retry is one second.
    pub fn backoff_delay(attempt: u32) -> Duration {
        let seconds = 2u64.saturating_pow(attempt.saturating_sub(1)).min(30);
        Duration::from_secs(seconds)
    }

    /// Runs `op` with throttling before every attempt and capped backoff
    /// between retries, up to `max_retries` additional attempts after the
    /// first. `is_transient` decides whether a failed result is worth
    /// retrying (5xx/network) versus returned immediately (4xx).
    pub async fn run_with_retry<T, E, F, Fut>(&self, mut op: F, is_transient: impl Fn(&E) -> bool) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;
        loop {
            self.throttle().await;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && is_transient(&err) => {
                    attempt += 1;
                    tokio::time::sleep(Self::backoff_delay(attempt)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delay_doubles_until_the_cap() {
        assert_eq!(RateLimiter::backoff_delay(1), Duration::from_secs(1));
        assert_eq!(RateLimiter::backoff_delay(2), Duration::from_secs(2));
        assert_eq!(RateLimiter::backoff_delay(3), Duration::from_secs(4));
        assert_eq!(RateLimiter::backoff_delay(6), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn throttle_enforces_the_minimum_interval() {
        let limiter = RateLimiter::new(20.0, 0);
        let start = Instant::now();
        limiter.throttle().await;
        limiter.throttle().await;
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn run_with_retry_stops_at_max_retries_on_persistent_transient_errors() {
        let limiter = RateLimiter::new(1000.0, 2);
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result: Result<(), &'static str> = limiter
            .run_with_retry(
                || {
                    attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    async { Err("boom") }
                },
                |_| true,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn run_with_retry_does_not_retry_non_transient_errors() {
        let limiter = RateLimiter::new(1000.0, 5);
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result: Result<(), &'static str> = limiter
            .run_with_retry(
                || {
                    attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    async { Err("not found") }
                },
                |_| false,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
