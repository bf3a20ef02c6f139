//! Per-source request pacing.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Minimum-interval rate limiter.
///
/// One limiter guards one source. `acquire` delays the caller until at least
/// the configured interval has passed since the previous acquisition, so a
/// burst of overlapping queries cannot hammer an upstream endpoint. Delay,
/// not rejection: callers always proceed, just spaced out.
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Wait until the next request slot, then claim it.
    ///
    /// The lock is held across the sleep so concurrent callers queue up and
    /// each gets its own interval.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn second_acquire_waits_for_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_calls_do_not_wait() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        limiter.acquire().await;
        sleep(Duration::from_millis(60)).await;
        let before = Instant::now();
        limiter.acquire().await;
        assert!(before.elapsed() < Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquires_are_serialized() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100)));
        let start = Instant::now();
        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }
        // Three acquisitions need at least two full intervals.
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
