//! Domain port surface for recording idempotency ledger outcomes.
//!
//! Lets the reservation workflow report misses, replays and conflicting
//! payloads without coupling to a metrics backend. Recording failures are
//! never allowed to fail the command.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors exposed when recording idempotency metrics.
    pub enum IdempotencyMetricsError {
        /// Metric exporter rejected the write.
        Export { message: String } => "idempotency metrics exporter failed: {message}",
    }
}

/// Labels attached to every idempotency metric write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyMetricLabels {
    /// Anonymized user scope (first 8 hex chars of SHA-256 of the user id).
    pub user_scope: String,
    /// Age bucket of the existing record (e.g. "0-1m", "1-5m"); `None` for
    /// misses.
    pub age_bucket: Option<String>,
}

impl IdempotencyMetricLabels {
    /// Labels for a fresh attempt.
    pub fn miss(user_id: &UserId) -> Self {
        Self {
            user_scope: user_scope_hash(user_id),
            age_bucket: None,
        }
    }

    /// Labels for an outcome decided by an existing record.
    pub fn existing(user_id: &UserId, created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            user_scope: user_scope_hash(user_id),
            age_bucket: Some(calculate_age_bucket(created_at, now)),
        }
    }
}

/// Bucket a record's age for low-cardinality labelling.
///
/// Buckets follow typical retry patterns within a 24-hour TTL: `0-1m`,
/// `1-5m`, `5-30m`, `30m-2h`, `2h-6h`, `6h-24h` and `>24h`. Negative ages
/// from clock skew land in `0-1m`.
pub fn calculate_age_bucket(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - created_at).num_minutes().max(0);

    match minutes {
        0 => "0-1m",
        1..=4 => "1-5m",
        5..=29 => "5-30m",
        30..=119 => "30m-2h",
        120..=359 => "2h-6h",
        360..=1439 => "6h-24h",
        _ => ">24h",
    }
    .to_owned()
}

/// First 8 hex characters of the SHA-256 of the user id.
pub fn user_scope_hash(user_id: &UserId) -> String {
    let digest = Sha256::digest(user_id.as_ref().as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}

/// Metrics recording port for idempotency outcomes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdempotencyMetrics: Send + Sync {
    /// Record a miss (this attempt owns the key).
    async fn record_miss(
        &self,
        labels: &IdempotencyMetricLabels,
    ) -> Result<(), IdempotencyMetricsError>;

    /// Record a hit (replay of a completed matching request).
    async fn record_hit(
        &self,
        labels: &IdempotencyMetricLabels,
    ) -> Result<(), IdempotencyMetricsError>;

    /// Record a conflict (same key, different payload).
    async fn record_conflict(
        &self,
        labels: &IdempotencyMetricLabels,
    ) -> Result<(), IdempotencyMetricsError>;
}

/// No-op implementation for when metrics are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpIdempotencyMetrics;

#[async_trait]
impl IdempotencyMetrics for NoOpIdempotencyMetrics {
    async fn record_miss(
        &self,
        _labels: &IdempotencyMetricLabels,
    ) -> Result<(), IdempotencyMetricsError> {
        Ok(())
    }

    async fn record_hit(
        &self,
        _labels: &IdempotencyMetricLabels,
    ) -> Result<(), IdempotencyMetricsError> {
        Ok(())
    }

    async fn record_conflict(
        &self,
        _labels: &IdempotencyMetricLabels,
    ) -> Result<(), IdempotencyMetricsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use rstest::rstest;

    #[rstest]
    #[case(TimeDelta::seconds(30), "0-1m")]
    #[case(TimeDelta::seconds(90), "1-5m")]
    #[case(TimeDelta::minutes(29), "5-30m")]
    #[case(TimeDelta::minutes(30), "30m-2h")]
    #[case(TimeDelta::hours(3), "2h-6h")]
    #[case(TimeDelta::hours(23), "6h-24h")]
    #[case(TimeDelta::hours(25), ">24h")]
    #[case(TimeDelta::minutes(-10), "0-1m")]
    fn age_buckets(#[case] age: TimeDelta, #[case] expected: &str) {
        let now = Utc::now();
        assert_eq!(calculate_age_bucket(now - age, now), expected);
    }

    #[test]
    fn user_scope_is_stable_short_hex() {
        let user = UserId::new("550e8400-e29b-41d4-a716-446655440000").expect("valid id");
        let scope = user_scope_hash(&user);
        assert_eq!(scope.len(), 8);
        assert!(scope.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(scope, user_scope_hash(&user));
    }

    #[tokio::test]
    async fn noop_accepts_every_outcome() {
        let metrics = NoOpIdempotencyMetrics;
        let labels = IdempotencyMetricLabels::miss(&UserId::random());
        assert!(metrics.record_miss(&labels).await.is_ok());
        assert!(metrics.record_hit(&labels).await.is_ok());
        assert!(metrics.record_conflict(&labels).await.is_ok());
    }

    #[test]
    fn error_constructor_accepts_str() {
        let err = IdempotencyMetricsError::export("registry closed");
        assert_eq!(
            err.to_string(),
            "idempotency metrics exporter failed: registry closed"
        );
    }
}
