//! Port for opening store transactions.
//!
//! A [`TransactionStore`] hands out [`StoreTransaction`] handles. Each handle
//! owns its connection for the lifetime of one attempt and exposes the
//! transaction-scoped writers; dropping a handle without committing discards
//! its work.

use std::fmt;

use async_trait::async_trait;

use super::{IdempotencyLedger, NotificationWriter, ReservationWriter, define_port_error};

define_port_error! {
    /// Errors raised while beginning or finishing a transaction.
    pub enum TransactionStoreError {
        /// No connection could be acquired.
        Connection { message: String } => "transaction store connection failed: {message}",
        /// The store reported a retryable conflict (typically on commit).
        Transient { message: String } => "transaction store transient conflict: {message}",
        /// A transaction control statement failed.
        Query { message: String } => "transaction store query failed: {message}",
    }
}

/// SQL transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// The level as written in `SET TRANSACTION ISOLATION LEVEL`.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// An open transaction exposing every transaction-scoped writer.
#[async_trait]
pub trait StoreTransaction: IdempotencyLedger + ReservationWriter + NotificationWriter + Send {
    /// Commit the attempt.
    async fn commit(self) -> Result<(), TransactionStoreError>;

    /// Roll the attempt back.
    async fn rollback(self) -> Result<(), TransactionStoreError>;
}

/// Source of transactions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Handle type for one attempt.
    type Tx: StoreTransaction + 'static;

    /// Acquire a connection and open a transaction at `isolation`.
    async fn begin(&self, isolation: IsolationLevel) -> Result<Self::Tx, TransactionStoreError>;
}
