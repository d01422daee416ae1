//! Environment-driven configuration for idempotency behaviour.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::env::{ConfigEnv, DefaultConfigEnv, parse_or};

/// Environment variable name for idempotency TTL configuration.
pub const IDEMPOTENCY_TTL_HOURS_ENV: &str = "IDEMPOTENCY_TTL_HOURS";

/// Configuration for the idempotency ledger.
///
/// Controls how long a ledger record stays authoritative. Records observed
/// past their expiry are treated as absent and may be reclaimed.
///
/// # Example
///
/// ```
/// # use booking_backend::domain::idempotency::IdempotencyConfig;
/// # use std::time::Duration;
/// let config = IdempotencyConfig::default();
/// assert_eq!(config.ttl(), Duration::from_secs(24 * 3600));
///
/// let custom = IdempotencyConfig::with_ttl(Duration::from_secs(12 * 3600));
/// assert_eq!(custom.ttl(), Duration::from_secs(12 * 3600));
/// ```
#[derive(Debug, Clone)]
pub struct IdempotencyConfig {
    ttl: Duration,
}

impl IdempotencyConfig {
    const DEFAULT_TTL_HOURS: u64 = 24;

    /// Shorter TTLs would let records expire before client retries arrive.
    const MIN_TTL_HOURS: u64 = 1;

    /// Ten years.
    const MAX_TTL_HOURS: u64 = 24 * 365 * 10;

    /// Load configuration from the real process environment.
    ///
    /// Reads `IDEMPOTENCY_TTL_HOURS` (default: 24), clamped to `[1, 87600]`.
    pub fn from_env() -> Self {
        Self::from_env_with(&DefaultConfigEnv)
    }

    /// Load configuration from a custom environment source.
    pub fn from_env_with(env: &impl ConfigEnv) -> Self {
        let hours = parse_or(env, IDEMPOTENCY_TTL_HOURS_ENV, Self::DEFAULT_TTL_HOURS)
            .clamp(Self::MIN_TTL_HOURS, Self::MAX_TTL_HOURS);
        Self {
            ttl: Duration::from_secs(hours.saturating_mul(3600)),
        }
    }

    /// Create with explicit TTL (for testing).
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Returns the configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Expiry instant for a record created at `now`.
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        now.checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(Self::DEFAULT_TTL_HOURS * 3600),
        }
    }
}
