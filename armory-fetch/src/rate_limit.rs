//! Token-bucket rate limiting.
//!
//! One [`RateLimiter`] exists per region and is shared by every fetcher that
//! talks to that region. A limiter enforces several quotas at once (per
//! second and per hour by default); a slot is granted only when every quota
//! has a token.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use armory_core::Region;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

// ============================================================================
// Quota
// ============================================================================

/// N requests per rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    /// Requests allowed per window (also the burst capacity).
    pub max_requests: u32,
    /// Window length.
    pub per: Duration,
}

impl Quota {
    /// Creates a quota.
    pub const fn new(max_requests: u32, per: Duration) -> Self {
        Self { max_requests, per }
    }

    /// `n` requests per second.
    pub const fn per_second(n: u32) -> Self {
        Self::new(n, Duration::from_secs(1))
    }

    /// `n` requests per hour.
    pub const fn per_hour(n: u32) -> Self {
        Self::new(n, Duration::from_secs(3600))
    }

    /// Published API limits: 100 requests/second and 36,000 requests/hour.
    pub fn api_defaults() -> Vec<Quota> {
        vec![Self::per_second(100), Self::per_hour(36_000)]
    }
}

// ============================================================================
// Bucket
// ============================================================================

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(quota: Quota, now: Instant) -> Self {
        let capacity = f64::from(quota.max_requests.max(1));
        let window = quota.per.as_secs_f64().max(f64::EPSILON);
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec: capacity / window,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_per_sec)
        }
    }
}

// ============================================================================
// Rate Limiter
// ============================================================================

/// Multi-quota token bucket.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<Vec<Bucket>>,
}

impl RateLimiter {
    /// Creates a limiter enforcing every quota in `quotas`.
    pub fn new(quotas: &[Quota]) -> Self {
        let now = Instant::now();
        Self {
            buckets: Mutex::new(quotas.iter().map(|q| Bucket::new(*q, now)).collect()),
        }
    }

    /// Takes a slot if every quota has one available.
    pub async fn try_acquire(&self) -> bool {
        let mut buckets = self.buckets.lock().await;
        Self::take(&mut buckets, Instant::now()).is_none()
    }

    /// Takes a slot, waiting until one is available.
    ///
    /// Returns the time spent waiting. The lock is released while sleeping,
    /// so a dropped future consumes nothing.
    pub async fn acquire(&self) -> Duration {
        let mut total_wait = Duration::ZERO;

        loop {
            let wait = {
                let mut buckets = self.buckets.lock().await;
                match Self::take(&mut buckets, Instant::now()) {
                    None => return total_wait,
                    Some(wait) => wait,
                }
            };

            trace!(wait = ?wait, "rate limited");
            tokio::time::sleep(wait).await;
            total_wait += wait;
        }
    }

    /// Tokens currently available under the tightest quota.
    pub async fn available(&self) -> f64 {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets
            .iter_mut()
            .map(|b| {
                b.refill(now);
                b.tokens
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Takes one token from every bucket, or returns how long to wait.
    fn take(buckets: &mut [Bucket], now: Instant) -> Option<Duration> {
        for bucket in buckets.iter_mut() {
            bucket.refill(now);
        }

        let wait = buckets
            .iter()
            .map(Bucket::time_until_available)
            .max()
            .unwrap_or(Duration::ZERO);

        if wait.is_zero() {
            for bucket in buckets.iter_mut() {
                bucket.tokens -= 1.0;
            }
            None
        } else {
            Some(wait)
        }
    }
}

// ============================================================================
// Region Limiters
// ============================================================================

/// Lazily created limiters, one per region.
#[derive(Debug)]
pub struct RegionLimiters {
    quotas: Vec<Quota>,
    limiters: Mutex<HashMap<Region, Arc<RateLimiter>>>,
}

impl RegionLimiters {
    /// Creates an empty set of limiters using `quotas` for each region.
    pub fn new(quotas: Vec<Quota>) -> Self {
        Self {
            quotas,
            limiters: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the region's limiter, creating it on first use.
    pub async fn get(&self, region: Region) -> Arc<RateLimiter> {
        let mut limiters = self.limiters.lock().await;
        Arc::clone(
            limiters
                .entry(region)
                .or_insert_with(|| Arc::new(RateLimiter::new(&self.quotas))),
        )
    }

    /// Acquires a slot from the region's limiter.
    pub async fn acquire(&self, region: Region) -> Duration {
        self.get(region).await.acquire().await
    }
}

impl Default for RegionLimiters {
    fn default() -> Self {
        Self::new(Quota::api_defaults())
    }
}
