//! Backoff policy for the resilient client
//!
//! The delay is a function of (attempt, failure class) so the retry loop can be
//! exercised without real waits: any `Fn(u32, FailureClass) -> Duration` is a
//! [`BackoffPolicy`].

use crate::error::FailureClass;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Computes the wait before the next attempt
pub trait BackoffPolicy: Send + Sync {
    /// `attempt` is the 1-based number of the attempt that just failed
    fn delay(&self, attempt: u32, class: FailureClass) -> Duration;

    /// Longest single wait, also applied to provider-requested delays
    fn max_delay(&self) -> Duration {
        Duration::MAX
    }
}

impl<F> BackoffPolicy for F
where
    F: Fn(u32, FailureClass) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: u32, class: FailureClass) -> Duration {
        self(attempt, class)
    }
}

/// Exponential backoff with bounded random jitter
///
/// Rate limits start from a much larger base than transient errors because
/// quota windows are tens of seconds wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExponentialBackoff {
    /// First wait after a rate-limit response
    #[serde(default = "default_rate_limit_base_secs")]
    pub rate_limit_base_secs: u64,

    /// First wait after a transient failure
    #[serde(default = "default_transient_base_secs")]
    pub transient_base_secs: u64,

    /// Upper bound for any single base delay
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    /// Upper bound for the random offset added to every delay
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

fn default_rate_limit_base_secs() -> u64 {
    20
}

fn default_transient_base_secs() -> u64 {
    2
}

fn default_max_delay_secs() -> u64 {
    120
}

fn default_max_jitter_ms() -> u64 {
    1000
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            rate_limit_base_secs: default_rate_limit_base_secs(),
            transient_base_secs: default_transient_base_secs(),
            max_delay_secs: default_max_delay_secs(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

impl ExponentialBackoff {
    /// Disable jitter, mostly for deterministic tests
    pub fn without_jitter(mut self) -> Self {
        self.max_jitter_ms = 0;
        self
    }

    /// Delay before jitter: base doubled once per previous failed attempt
    pub fn base_delay(&self, attempt: u32, class: FailureClass) -> Duration {
        let base = match class {
            FailureClass::RateLimit => self.rate_limit_base_secs,
            FailureClass::Transient => self.transient_base_secs,
            _ => return Duration::ZERO,
        };
        let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_secs(base.saturating_mul(multiplier).min(self.max_delay_secs))
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=self.max_jitter_ms))
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32, class: FailureClass) -> Duration {
        if !class.is_retryable() {
            return Duration::ZERO;
        }
        self.base_delay(attempt, class).saturating_add(self.jitter())
    }

    fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}
