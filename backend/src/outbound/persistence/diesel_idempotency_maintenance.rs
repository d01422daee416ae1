//! Purges expired ledger records.
//!
//! Expired records are already ignored by the workflow; removal only bounds
//! table growth. Run periodically by the `idempotency-sweep` binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{IdempotencyMaintenance, IdempotencyMaintenanceError};

use super::diesel_error_mapping::{StoreFailure, classify_diesel_error, pool_error_message};
use super::pool::DbPool;
use super::schema::idempotency_records;

/// Diesel-backed [`IdempotencyMaintenance`].
#[derive(Clone)]
pub struct DieselIdempotencyMaintenance {
    pool: DbPool,
}

impl DieselIdempotencyMaintenance {
    /// Create a maintenance adapter drawing connections from `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> IdempotencyMaintenanceError {
    match classify_diesel_error(error) {
        StoreFailure::Connection(message) => IdempotencyMaintenanceError::connection(message),
        StoreFailure::Transient(message)
        | StoreFailure::UniqueViolation(message)
        | StoreFailure::ForeignKeyViolation(message) => IdempotencyMaintenanceError::query(message),
        StoreFailure::Query(message) => IdempotencyMaintenanceError::query(message),
    }
}

#[async_trait]
impl IdempotencyMaintenance for DieselIdempotencyMaintenance {
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyMaintenanceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| IdempotencyMaintenanceError::connection(pool_error_message(err)))?;

        let deleted = diesel::delete(idempotency_records::table)
            .filter(idempotency_records::expires_at.le(now))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        debug!(deleted, cutoff = %now, "purged expired idempotency records");
        Ok(deleted as u64)
    }
}
