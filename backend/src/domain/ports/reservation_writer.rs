//! Transaction-scoped reservation persistence.

use async_trait::async_trait;

use crate::domain::reservations::Reservation;

use super::define_port_error;

define_port_error! {
    /// Errors raised when persisting reservations.
    pub enum ReservationWriteError {
        /// The slot overlaps an existing reservation on the same resource.
        SlotConflict { message: String } => "reservation slot unavailable: {message}",
        /// The referenced resource disappeared since it was read.
        MissingResource { message: String } => "reservation resource missing: {message}",
        /// The store connection failed.
        Connection { message: String } => "reservation writer connection failed: {message}",
        /// The store reported a retryable conflict.
        Transient { message: String } => "reservation writer transient conflict: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "reservation writer query failed: {message}",
    }
}

/// Writes reservations inside a transaction attempt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationWriter: Send {
    /// Persist a new reservation.
    ///
    /// Overlap with a non-cancelled reservation on the same resource is
    /// reported as [`ReservationWriteError::SlotConflict`].
    async fn create(&mut self, reservation: &Reservation) -> Result<(), ReservationWriteError>;
}
