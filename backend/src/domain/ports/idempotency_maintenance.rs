//! Port for out-of-band ledger housekeeping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;

define_port_error! {
    /// Errors raised while purging ledger records.
    pub enum IdempotencyMaintenanceError {
        /// The store connection failed.
        Connection { message: String } => "idempotency maintenance connection failed: {message}",
        /// The purge statement failed.
        Query { message: String } => "idempotency maintenance query failed: {message}",
    }
}

/// Physical removal of ledger records that are logically absent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdempotencyMaintenance: Send + Sync {
    /// Delete every record whose expiry is at or before `now`.
    ///
    /// Returns the number of records deleted.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyMaintenanceError>;
}
