//! Token-bucket rate limiter, one per adapter (spec §4.5).

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::time::sleep;

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }
}

/// `acquire()` sleeps until a token is available, then spends it.
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: requests_per_second,
                capacity: requests_per_second,
                refill_per_sec: requests_per_second,
                last_refill: Instant::now(),
            }),
        }
    }

    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock();
                bucket.refill();
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - bucket.tokens;
                    Some(Duration::from_secs_f64(deficit / bucket.refill_per_sec))
                }
            };
            match wait {
                None => return,
                Some(duration) => sleep(duration.max(Duration::from_millis(1))).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drains_burst_capacity_immediately() {
        let limiter = RateLimiter::new(10.0);
        for _ in 0..10 {
            limiter.acquire().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn blocks_once_bucket_is_empty() {
        let limiter = RateLimiter::new(2.0);
        limiter.acquire().await;
        limiter.acquire().await;

        let start = tokio::time::Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(400));
    }
}
