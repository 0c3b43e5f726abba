//! Retry policy for API requests.
//!
//! [`RetryPolicy`] holds the budgets and delay bounds; [`Backoff`] walks one
//! request's retry sequence and keeps its delays non-decreasing.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Retry budgets and backoff bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after HTTP 429 before giving up.
    pub rate_limit_retries: u32,
    /// Retries after a network error, timeout or 5xx before giving up.
    pub transient_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Random extra fraction added to each delay (0.0 disables jitter).
    pub jitter_factor: f64,
}

impl RetryPolicy {
    /// Creates a policy with the given 429 retry budget.
    pub fn new(rate_limit_retries: u32) -> Self {
        Self {
            rate_limit_retries,
            ..Self::default()
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            rate_limit_retries: 0,
            transient_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_factor: 0.0,
        }
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the transient-error retry budget.
    pub fn with_transient_retries(mut self, retries: u32) -> Self {
        self.transient_retries = retries;
        self
    }

    /// Sets the jitter factor, clamped to `0.0..=1.0`.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Exponential delay for a 1-based attempt number, without jitter.
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay)
    }

    /// Calculates the delay for a given attempt number, with jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_for_attempt(attempt);
        if self.jitter_factor <= 0.0 || delay.is_zero() {
            return delay;
        }

        let extra = rand::thread_rng().gen_range(0.0..self.jitter_factor);
        delay.mul_f64(1.0 + extra).min(self.max_delay)
    }

    /// Starts a retry sequence for one request.
    pub fn backoff(&self) -> Backoff<'_> {
        Backoff {
            policy: self,
            attempt: 0,
            last: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rate_limit_retries: 3,
            transient_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter_factor: 0.25,
        }
    }
}

// ============================================================================
// Backoff
// ============================================================================

/// Delay sequence of one request's retries.
///
/// Delays never decrease and never exceed the policy's max delay.
#[derive(Debug)]
pub struct Backoff<'a> {
    policy: &'a RetryPolicy,
    attempt: u32,
    last: Duration,
}

impl Backoff<'_> {
    /// Number of delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Returns the next delay.
    ///
    /// A server-supplied `retry_after` takes precedence over the computed
    /// backoff, clamped to the max delay.
    pub fn next_delay(&mut self, retry_after: Option<Duration>) -> Duration {
        self.attempt += 1;
        let max = self.policy.max_delay;

        let delay = match retry_after {
            Some(requested) if requested > max => {
                warn!(
                    requested_secs = requested.as_secs(),
                    max_secs = max.as_secs(),
                    "Retry-After exceeds max delay, clamping"
                );
                max
            }
            Some(requested) => requested,
            None => self.policy.delay_for_attempt(self.attempt),
        };

        let delay = delay.max(self.last).min(max);
        self.last = delay;
        delay
    }
}

/// Parses a `Retry-After` header value given in delta-seconds.
///
/// HTTP-date values are not used by the API and yield `None`.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}
