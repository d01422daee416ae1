//! Retry configuration for the transaction coordinator.

use std::time::Duration;

use crate::domain::env::{ConfigEnv, DefaultConfigEnv, parse_or};

/// Maximum retries after the first attempt.
pub const TX_MAX_RETRIES_ENV: &str = "TX_MAX_RETRIES";
/// Backoff before the first retry, in milliseconds.
pub const TX_BASE_BACKOFF_MS_ENV: &str = "TX_BASE_BACKOFF_MS";
/// Upper bound of the random jitter as a percentage of the backoff.
pub const TX_JITTER_RATIO_PERCENT_ENV: &str = "TX_JITTER_RATIO_PERCENT";
/// Optional seed making jitter deterministic.
pub const TX_JITTER_SEED_ENV: &str = "TX_JITTER_SEED";

/// Retry policy for transient store conflicts.
///
/// The wait after failed attempt `n` (0-based) is `base * 2^n` plus a random
/// jitter of at most `jitter_ratio_percent` of that wait.
///
/// # Example
///
/// ```
/// # use booking_backend::domain::transaction::TransactionConfig;
/// # use std::time::Duration;
/// let config = TransactionConfig::default();
/// assert_eq!(config.max_retries(), 3);
/// assert_eq!(config.retry_base_delay(2), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionConfig {
    max_retries: u32,
    base_backoff: Duration,
    jitter_ratio_percent: u8,
    jitter_seed: Option<u64>,
}

impl TransactionConfig {
    const DEFAULT_MAX_RETRIES: u32 = 3;
    const MAX_MAX_RETRIES: u32 = 10;
    const DEFAULT_BASE_BACKOFF_MS: u64 = 100;
    const MIN_BASE_BACKOFF_MS: u64 = 1;
    const MAX_BASE_BACKOFF_MS: u64 = 10_000;
    const DEFAULT_JITTER_RATIO_PERCENT: u8 = 20;
    const MAX_JITTER_RATIO_PERCENT: u8 = 100;

    /// Load configuration from the real process environment.
    pub fn from_env() -> Self {
        Self::from_env_with(&DefaultConfigEnv)
    }

    /// Load configuration from a custom environment source.
    ///
    /// Malformed values fall back to the defaults; numeric values are
    /// clamped to their supported ranges.
    pub fn from_env_with(env: &impl ConfigEnv) -> Self {
        let max_retries = parse_or(env, TX_MAX_RETRIES_ENV, Self::DEFAULT_MAX_RETRIES)
            .min(Self::MAX_MAX_RETRIES);
        let base_ms = parse_or(env, TX_BASE_BACKOFF_MS_ENV, Self::DEFAULT_BASE_BACKOFF_MS)
            .clamp(Self::MIN_BASE_BACKOFF_MS, Self::MAX_BASE_BACKOFF_MS);
        let jitter_ratio_percent = parse_or(
            env,
            TX_JITTER_RATIO_PERCENT_ENV,
            Self::DEFAULT_JITTER_RATIO_PERCENT,
        )
        .min(Self::MAX_JITTER_RATIO_PERCENT);
        let jitter_seed = env
            .string(TX_JITTER_SEED_ENV)
            .and_then(|raw| raw.trim().parse::<u64>().ok());

        Self {
            max_retries,
            base_backoff: Duration::from_millis(base_ms),
            jitter_ratio_percent,
            jitter_seed,
        }
    }

    /// Override the retry count.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.min(Self::MAX_MAX_RETRIES);
        self
    }

    /// Override the base backoff.
    #[must_use]
    pub fn with_base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    /// Retries permitted after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Wait before the first retry, before jitter.
    pub fn base_backoff(&self) -> Duration {
        self.base_backoff
    }

    /// Upper bound of the jitter as a percentage of the wait.
    pub fn jitter_ratio_percent(&self) -> u8 {
        self.jitter_ratio_percent
    }

    /// Seed for deterministic jitter, when configured.
    pub fn jitter_seed(&self) -> Option<u64> {
        self.jitter_seed
    }

    /// Un-jittered wait after the failed attempt with 0-based index `attempt`.
    pub fn retry_base_delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        self.base_backoff.saturating_mul(factor)
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
            base_backoff: Duration::from_millis(Self::DEFAULT_BASE_BACKOFF_MS),
            jitter_ratio_percent: Self::DEFAULT_JITTER_RATIO_PERCENT,
            jitter_seed: None,
        }
    }
}
