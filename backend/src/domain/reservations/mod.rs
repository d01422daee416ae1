//! Reservation domain types.
//!
//! A reservation books one resource for a half-open time slot. Requests are
//! normalized before fingerprinting so cosmetic differences between client
//! retries (coupon case, note padding, timestamp offsets) hash identically.

use std::fmt;
use std::str::FromStr;

mod entity;
mod pricing;
mod request;

pub use entity::{Reservation, ReservationDraft, TimeSlot};
pub use pricing::{ensure_lead_time, quote_price};
pub use request::{CreateReservationRequest, NOTE_MAX_CHARS, NormalizedReservationRequest};
pub(crate) use request::render_timestamp;

/// Validation errors raised while normalizing requests and building
/// reservations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReservationValidationError {
    #[error("{field} must be an RFC 3339 timestamp")]
    InvalidTimestamp { field: &'static str },
    #[error("start_time must be before end_time")]
    EmptySlot,
    #[error("note must be at most {max} characters")]
    NoteTooLong { max: usize },
    #[error("reservation must start at least {minimum_minutes} minutes from now")]
    LeadTimeTooShort { minimum_minutes: u32 },
    #[error("coupon is not valid for this reservation time")]
    CouponNotApplicable,
    #[error("total price must not be negative")]
    NegativePrice,
    #[error("total price exceeds the supported range")]
    PriceOverflow,
}

/// Lifecycle state of a reservation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationStatus {
    /// Created and awaiting confirmation.
    Pending,
    /// Confirmed by the resource owner.
    Confirmed,
    /// Cancelled; no longer occupies its slot.
    Cancelled,
}

impl ReservationStatus {
    /// Returns the database string representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown reservation status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid reservation status '{input}'")]
pub struct ParseReservationStatusError {
    /// The invalid input string.
    pub input: String,
}

impl FromStr for ReservationStatus {
    type Err = ParseReservationStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ParseReservationStatusError {
                input: other.to_owned(),
            }),
        }
    }
}
