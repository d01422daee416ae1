//! Domain primitives, ports and services of the booking command core.
//!
//! Purpose: keep reservation rules, idempotency arbitration and transaction
//! retry policy independent of any storage engine. Adapters live under
//! `crate::outbound` and plug in through the traits in [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`): stable error payload for callers.
//! - ErrorCode (alias to `error::ErrorCode`): error identifier.
//! - UserId (alias to `user::UserId`): identity scoping keys and bookings.
//! - TransactionCoordinator: retried unit-of-work runner.
//! - CreateReservationService: the reservation creation workflow.

pub mod env;
pub mod error;
pub mod idempotency;
pub mod notifications;
pub mod ports;
pub mod reservation_service;
pub mod reservations;
pub mod snapshots;
pub mod transaction;
pub mod user;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::reservation_service::CreateReservationService;
pub use self::transaction::{TransactionConfig, TransactionCoordinator};
pub use self::user::{UserId, UserIdValidationError};

/// Convenient command result alias.
///
/// # Examples
/// ```
/// use booking_backend::domain::{CommandResult, Error};
///
/// fn handler() -> CommandResult<()> {
///     Err(Error::not_found("resource missing"))
/// }
/// ```
pub type CommandResult<T> = Result<T, Error>;
