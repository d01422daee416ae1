//! Driving port for reservation creation.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::idempotency::IdempotencyKey;
use crate::domain::reservations::CreateReservationRequest;
use crate::domain::snapshots::ReservationView;
use crate::domain::{Error, UserId};

/// Authenticated, keyed reservation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReservationCommand {
    pub request: CreateReservationRequest,
    pub user_id: UserId,
    /// Client token reused verbatim across retries.
    pub idempotency_key: IdempotencyKey,
}

/// Result of a create-reservation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReservationResult {
    pub reservation_id: Uuid,
    /// `true` when an earlier submission with the same key produced the
    /// reservation.
    pub is_replayed: bool,
    pub reservation: ReservationView,
}

/// Create reservations exactly once per (key, user).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationCommand: Send + Sync {
    /// Create a reservation, or replay the result of an earlier identical
    /// submission.
    ///
    /// Cancelling `cancel` aborts the current attempt and suppresses retries.
    async fn create_reservation(
        &self,
        cancel: &CancellationToken,
        command: CreateReservationCommand,
    ) -> Result<CreateReservationResult, Error>;
}
