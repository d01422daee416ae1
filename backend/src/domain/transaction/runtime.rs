//! Sleeping and jitter seams used between transaction attempts.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};

use super::TransactionConfig;

/// Async sleeping abstraction for retry backoff.
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Retry backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Return the delay to wait, given the un-jittered exponential `base`.
    ///
    /// ```rust
    /// use booking_backend::domain::transaction::BackoffJitter;
    /// use std::time::Duration;
    /// struct FixedJitter;
    /// impl BackoffJitter for FixedJitter {
    ///     fn jittered_delay(&self, base: Duration, attempt: u32) -> Duration {
    ///         base + Duration::from_millis(u64::from(attempt) * 5)
    ///     }
    /// }
    /// let delay = FixedJitter.jittered_delay(Duration::from_millis(100), 2);
    /// assert_eq!(delay, Duration::from_millis(110));
    /// ```
    fn jittered_delay(&self, base: Duration, attempt: u32) -> Duration;
}

/// Runtime helpers used between attempts.
pub struct TransactionRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn RetrySleeper>,
    /// Jitter strategy for retry delays.
    pub jitter: Arc<dyn BackoffJitter>,
}

impl TransactionRuntime {
    /// Tokio sleeping plus the jitter source selected by `config`: seeded
    /// when `TX_JITTER_SEED` is set, the OS RNG otherwise.
    pub fn from_config(config: &TransactionConfig) -> Self {
        let ratio = config.jitter_ratio_percent();
        let jitter: Arc<dyn BackoffJitter> = match config.jitter_seed() {
            Some(seed) => Arc::new(SeededJitter::new(seed, ratio)),
            None => Arc::new(OsRngJitter::new(ratio)),
        };
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter,
        }
    }
}

impl Default for TransactionRuntime {
    fn default() -> Self {
        Self::from_config(&TransactionConfig::default())
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

fn max_extra_micros(base: Duration, ratio_percent: u8) -> u64 {
    let base_us = u64::try_from(base.as_micros()).unwrap_or(u64::MAX);
    base_us.saturating_mul(u64::from(ratio_percent)) / 100
}

fn add_micros(base: Duration, extra: u64) -> Duration {
    base.saturating_add(Duration::from_micros(extra))
}

/// Jitter drawn from the operating system's cryptographic RNG.
#[derive(Debug, Clone, Copy)]
pub struct OsRngJitter {
    ratio_percent: u8,
}

impl OsRngJitter {
    /// Jitter of at most `ratio_percent` of each wait.
    pub fn new(ratio_percent: u8) -> Self {
        Self { ratio_percent }
    }
}

impl BackoffJitter for OsRngJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32) -> Duration {
        let max_extra = max_extra_micros(base, self.ratio_percent);
        add_micros(base, OsRng.gen_range(0..=max_extra))
    }
}

/// Deterministic jitter from a seeded RNG.
#[derive(Debug)]
pub struct SeededJitter {
    ratio_percent: u8,
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    /// Jitter of at most `ratio_percent` of each wait, reproducible for a
    /// given `seed`.
    pub fn new(seed: u64, ratio_percent: u8) -> Self {
        Self {
            ratio_percent,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl BackoffJitter for SeededJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32) -> Duration {
        let max_extra = max_extra_micros(base, self.ratio_percent);
        let extra = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..=max_extra);
        add_micros(base, extra)
    }
}
