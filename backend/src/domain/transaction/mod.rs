//! Retrying transaction coordinator.
//!
//! [`TransactionCoordinator::within`] opens a READ COMMITTED transaction,
//! hands the caller's unit of work a transaction handle, and commits. Work
//! failing with a transient store conflict is rolled back and retried with
//! jittered exponential backoff; every other failure propagates after
//! rollback. No transaction is ever held across a retry boundary.

use std::sync::Arc;

use scoped_futures::ScopedBoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::domain::Error;
use crate::domain::ports::{
    IsolationLevel, StoreTransaction, TransactionStore, TransactionStoreError,
};

mod config;
mod runtime;

pub use config::{
    TX_BASE_BACKOFF_MS_ENV, TX_JITTER_RATIO_PERCENT_ENV, TX_JITTER_SEED_ENV, TX_MAX_RETRIES_ENV,
    TransactionConfig,
};
pub use runtime::{
    BackoffJitter, OsRngJitter, RetrySleeper, SeededJitter, TokioSleeper, TransactionRuntime,
};

/// Runs units of work inside retried store transactions.
pub struct TransactionCoordinator<S> {
    store: Arc<S>,
    config: TransactionConfig,
    runtime: TransactionRuntime,
}

impl<S> TransactionCoordinator<S>
where
    S: TransactionStore,
{
    /// Build a coordinator using the runtime selected by `config`.
    pub fn new(store: Arc<S>, config: TransactionConfig) -> Self {
        let runtime = TransactionRuntime::from_config(&config);
        Self::with_runtime(store, config, runtime)
    }

    /// Build a coordinator with injected sleeping and jitter.
    pub fn with_runtime(store: Arc<S>, config: TransactionConfig, runtime: TransactionRuntime) -> Self {
        Self {
            store,
            config,
            runtime,
        }
    }

    /// Retry settings in effect.
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Run `work` in a transaction, retrying transient conflicts.
    ///
    /// `work` is invoked once per attempt with a fresh handle, so it must
    /// not assume earlier attempts left any trace. Cancelling `cancel`
    /// while beginning, while `work` runs, or during backoff aborts with
    /// [`crate::domain::ErrorCode::Cancelled`] and no further attempt is
    /// made. Once every permitted attempt failed transiently the result is
    /// [`crate::domain::ErrorCode::RetriesExhausted`] wrapping the last
    /// cause. Once `work` has succeeded the commit runs to completion;
    /// cancellation is not observed again until the next attempt.
    pub async fn within<'a, T, F>(&self, cancel: &CancellationToken, mut work: F) -> Result<T, Error>
    where
        T: Send + 'a,
        F: for<'r> FnMut(&'r mut S::Tx) -> ScopedBoxFuture<'a, 'r, Result<T, Error>> + Send + 'a,
    {
        let max_retries = self.config.max_retries();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::cancelled());
            }

            let err = match self.run_attempt(cancel, &mut work).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => err,
                Err(err) => return Err(err),
            };

            if attempt >= max_retries {
                let attempts = attempt.saturating_add(1);
                error!(attempts, error = %err, "transaction retries exhausted");
                return Err(Error::retries_exhausted(attempts, err));
            }

            let delay = self
                .runtime
                .jitter
                .jittered_delay(self.config.retry_base_delay(attempt), attempt);
            warn!(
                attempt = attempt.saturating_add(1),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient store conflict; retrying transaction"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::cancelled()),
                () = self.runtime.sleeper.sleep(delay) => {}
            }
            attempt = attempt.saturating_add(1);
        }
    }

    async fn run_attempt<'a, T, F>(&self, cancel: &CancellationToken, work: &mut F) -> Result<T, Error>
    where
        T: Send + 'a,
        F: for<'r> FnMut(&'r mut S::Tx) -> ScopedBoxFuture<'a, 'r, Result<T, Error>> + Send + 'a,
    {
        let begun = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::cancelled()),
            begun = self.store.begin(IsolationLevel::ReadCommitted) => begun,
        };
        let mut tx = begun.map_err(map_transaction_error)?;

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::cancelled()),
            result = work(&mut tx) => result,
        };

        match outcome {
            Ok(value) => {
                tx.commit().await.map_err(map_transaction_error)?;
                Ok(value)
            }
            Err(err) => {
                debug!(code = %err.code(), "rolling back transaction attempt");
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(error = %rollback_error, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}

fn map_transaction_error(error: TransactionStoreError) -> Error {
    match error {
        TransactionStoreError::Connection { message } => {
            Error::service_unavailable(format!("transaction store unavailable: {message}"))
        }
        TransactionStoreError::Transient { message } => {
            Error::transient(format!("transaction conflict: {message}"))
        }
        TransactionStoreError::Query { message } => {
            Error::internal(format!("transaction control failed: {message}"))
        }
    }
}
