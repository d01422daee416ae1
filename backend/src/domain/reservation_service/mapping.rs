//! Port error to domain error mapping for the reservation workflow.

use crate::domain::Error;
use crate::domain::ports::{
    IdempotencyLedgerError, NotificationWriteError, ReservationWriteError, SnapshotReadError,
};
use crate::domain::reservations::ReservationValidationError;

pub(super) fn map_validation_error(error: ReservationValidationError) -> Error {
    Error::invalid_request(error.to_string())
}

pub(super) fn map_snapshot_error(error: SnapshotReadError) -> Error {
    match error {
        SnapshotReadError::Connection { message } => {
            Error::service_unavailable(format!("snapshot store unavailable: {message}"))
        }
        SnapshotReadError::Query { message } => {
            Error::internal(format!("snapshot query failed: {message}"))
        }
        SnapshotReadError::Corrupt { message } => {
            Error::internal(format!("stored snapshot is invalid: {message}"))
        }
    }
}

pub(super) fn map_ledger_error(error: IdempotencyLedgerError) -> Error {
    match error {
        IdempotencyLedgerError::Connection { message } => {
            Error::service_unavailable(format!("idempotency ledger unavailable: {message}"))
        }
        IdempotencyLedgerError::Transient { message } => {
            Error::transient(format!("idempotency ledger conflict: {message}"))
        }
        IdempotencyLedgerError::Query { message } => {
            Error::internal(format!("idempotency ledger error: {message}"))
        }
        IdempotencyLedgerError::Corrupt { message } => {
            Error::internal(format!("idempotency record is invalid: {message}"))
        }
    }
}

pub(super) fn map_reservation_write_error(error: ReservationWriteError) -> Error {
    match error {
        ReservationWriteError::SlotConflict { .. } => {
            Error::reservation_conflict("requested slot overlaps an existing reservation")
        }
        ReservationWriteError::MissingResource { .. } => Error::not_found("resource not found"),
        ReservationWriteError::Connection { message } => {
            Error::service_unavailable(format!("reservation store unavailable: {message}"))
        }
        ReservationWriteError::Transient { message } => {
            Error::transient(format!("reservation write conflict: {message}"))
        }
        ReservationWriteError::Query { message } => {
            Error::internal(format!("reservation write failed: {message}"))
        }
    }
}

pub(super) fn map_notification_error(error: NotificationWriteError) -> Error {
    match error {
        NotificationWriteError::Connection { message } => {
            Error::service_unavailable(format!("notification store unavailable: {message}"))
        }
        NotificationWriteError::Transient { message } => {
            Error::transient(format!("notification write conflict: {message}"))
        }
        NotificationWriteError::Query { message } => {
            Error::internal(format!("notification enqueue failed: {message}"))
        }
    }
}
