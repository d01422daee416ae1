//! Port for read-only, point-in-time projections.
//!
//! Reads go through the same store as the transactional writers but run
//! outside any write transaction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::idempotency::{IdempotencyKey, IdempotencyRecord};
use crate::domain::snapshots::{
    CouponSnapshot, ReservationSnapshot, ReservationView, ResourceSnapshot,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by snapshot reader adapters.
    pub enum SnapshotReadError {
        /// The store connection failed.
        Connection { message: String } => "snapshot reader connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "snapshot reader query failed: {message}",
        /// A stored row could not be mapped into a snapshot.
        Corrupt { message: String } => "snapshot row is invalid: {message}",
    }
}

/// Read-only snapshot queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotReader: Send + Sync {
    /// Fetch a resource by id.
    async fn resource_by_id(&self, id: Uuid) -> Result<Option<ResourceSnapshot>, SnapshotReadError>;

    /// Fetch a coupon by code, compared case-insensitively.
    async fn coupon_by_code(&self, code: &str) -> Result<Option<CouponSnapshot>, SnapshotReadError>;

    /// Fetch a reservation summary by id.
    async fn reservation_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<ReservationSnapshot>, SnapshotReadError>;

    /// Fetch the full reservation projection by id.
    async fn reservation_view_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<ReservationView>, SnapshotReadError>;

    /// Fetch the ledger record for (key, user), expired or not.
    async fn idempotency_by_key(
        &self,
        key: &IdempotencyKey,
        user_id: &UserId,
    ) -> Result<Option<IdempotencyRecord>, SnapshotReadError>;
}
