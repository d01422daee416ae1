//! Prometheus adapter for idempotency ledger outcomes.
//!
//! Counters are registered with a caller-provided registry; exposing them is
//! left to whichever process embeds the command core.

use async_trait::async_trait;
use prometheus::{IntCounterVec, Opts, Registry};

use crate::domain::idempotency::CommandEndpoint;
use crate::domain::ports::{IdempotencyMetricLabels, IdempotencyMetrics, IdempotencyMetricsError};

/// Counter name for ledger outcomes.
pub const REQUESTS_TOTAL: &str = "booking_idempotency_requests_total";

/// Prometheus-backed idempotency metrics recorder.
///
/// # Metric Specification
///
/// - **Name**: `booking_idempotency_requests_total`
/// - **Type**: Counter
/// - **Const labels**: `endpoint` (e.g. `reservations.create`)
/// - **Labels**:
///   - `outcome`: `miss`, `hit`, or `conflict`
///   - `user_scope`: 8-character hex hash of user ID
///   - `age_bucket`: `0-1m`, `1-5m`, `5-30m`, `30m-2h`, `2h-6h`, `6h-24h`,
///     `>24h`, or `n/a`
#[derive(Clone)]
pub struct PrometheusIdempotencyMetrics {
    requests_total: IntCounterVec,
}

impl PrometheusIdempotencyMetrics {
    /// Create and register the counter for `endpoint` with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be registered, e.g. when the
    /// registry already holds one for the same endpoint.
    pub fn new(registry: &Registry, endpoint: CommandEndpoint) -> Result<Self, prometheus::Error> {
        let requests_total = IntCounterVec::new(
            Opts::new(REQUESTS_TOTAL, "Idempotent command submissions by ledger outcome")
                .const_label("endpoint", endpoint.as_str()),
            &["outcome", "user_scope", "age_bucket"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;
        Ok(Self { requests_total })
    }

    fn record(&self, outcome: &str, labels: &IdempotencyMetricLabels) {
        let age_bucket = labels.age_bucket.as_deref().unwrap_or("n/a");
        self.requests_total
            .with_label_values(&[outcome, labels.user_scope.as_str(), age_bucket])
            .inc();
    }
}

#[async_trait]
impl IdempotencyMetrics for PrometheusIdempotencyMetrics {
    async fn record_miss(
        &self,
        labels: &IdempotencyMetricLabels,
    ) -> Result<(), IdempotencyMetricsError> {
        self.record("miss", labels);
        Ok(())
    }

    async fn record_hit(
        &self,
        labels: &IdempotencyMetricLabels,
    ) -> Result<(), IdempotencyMetricsError> {
        self.record("hit", labels);
        Ok(())
    }

    async fn record_conflict(
        &self,
        labels: &IdempotencyMetricLabels,
    ) -> Result<(), IdempotencyMetricsError> {
        self.record("conflict", labels);
        Ok(())
    }
}
