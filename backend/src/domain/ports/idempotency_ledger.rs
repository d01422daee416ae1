//! Port abstraction for the transaction-scoped idempotency ledger.
//!
//! The ledger is reachable only through a [`super::StoreTransaction`]
//! handle: every call participates in the surrounding attempt and is rolled
//! back with it. The uniqueness of (key, user) in storage is the only
//! synchronization primitive between concurrent submissions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::UserId;
use crate::domain::idempotency::{
    IdempotencyCompletion, IdempotencyKey, IdempotencyRecord, InsertOutcome, NewIdempotencyEntry,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by idempotency ledger adapters.
    pub enum IdempotencyLedgerError {
        /// The store connection failed.
        Connection { message: String } => "idempotency ledger connection failed: {message}",
        /// The store reported a retryable conflict.
        Transient { message: String } => "idempotency ledger transient conflict: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "idempotency ledger query failed: {message}",
        /// A stored row could not be mapped back into a record.
        Corrupt { message: String } => "idempotency ledger row is invalid: {message}",
    }
}

/// Ledger operations available inside a transaction attempt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdempotencyLedger: Send {
    /// Insert a `processing` record for the entry's (key, user).
    ///
    /// A uniqueness collision is reported as [`InsertOutcome::Conflict`]
    /// and never aborts the surrounding transaction.
    async fn try_insert(
        &mut self,
        entry: &NewIdempotencyEntry,
    ) -> Result<InsertOutcome, IdempotencyLedgerError>;

    /// Fetch the record for (key, user), expired or not.
    async fn get(
        &mut self,
        key: &IdempotencyKey,
        user_id: &UserId,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyLedgerError>;

    /// Transition the `processing` record for (key, user) to `completed`.
    async fn mark_completed(
        &mut self,
        key: &IdempotencyKey,
        user_id: &UserId,
        completion: &IdempotencyCompletion,
    ) -> Result<(), IdempotencyLedgerError>;

    /// Overwrite an expired record with the entry as a fresh `processing`
    /// record.
    ///
    /// Returns `false` when the record is no longer expired at `now`,
    /// typically because a concurrent attempt reclaimed it first.
    async fn reclaim_expired(
        &mut self,
        entry: &NewIdempotencyEntry,
        now: DateTime<Utc>,
    ) -> Result<bool, IdempotencyLedgerError>;
}
