//! Write-side reservation entity.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::UserId;

use super::{NOTE_MAX_CHARS, ReservationStatus, ReservationValidationError};

/// Half-open booking interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeSlot {
    /// Build a slot, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ReservationValidationError> {
        if start >= end {
            return Err(ReservationValidationError::EmptySlot);
        }
        Ok(Self { start, end })
    }

    /// Inclusive start instant.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end instant.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the slot in whole seconds.
    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    /// Whether two slots share any instant.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Input payload for [`Reservation::new`].
#[derive(Debug, Clone)]
pub struct ReservationDraft {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub user_id: UserId,
    pub slot: TimeSlot,
    pub note: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub total_price_cents: i64,
}

/// A reservation about to be persisted. New reservations are always
/// `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    id: Uuid,
    resource_id: Uuid,
    user_id: UserId,
    slot: TimeSlot,
    note: Option<String>,
    coupon_id: Option<Uuid>,
    total_price_cents: i64,
    status: ReservationStatus,
}

impl Reservation {
    /// Creates a validated pending reservation.
    pub fn new(draft: ReservationDraft) -> Result<Self, ReservationValidationError> {
        let ReservationDraft {
            id,
            resource_id,
            user_id,
            slot,
            note,
            coupon_id,
            total_price_cents,
        } = draft;

        if total_price_cents < 0 {
            return Err(ReservationValidationError::NegativePrice);
        }
        if note
            .as_deref()
            .is_some_and(|text| text.chars().count() > NOTE_MAX_CHARS)
        {
            return Err(ReservationValidationError::NoteTooLong {
                max: NOTE_MAX_CHARS,
            });
        }

        Ok(Self {
            id,
            resource_id,
            user_id,
            slot,
            note,
            coupon_id,
            total_price_cents,
            status: ReservationStatus::Pending,
        })
    }

    /// Reservation identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Booked resource.
    pub fn resource_id(&self) -> Uuid {
        self.resource_id
    }

    /// Owner of the booking.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Booked time range.
    pub fn slot(&self) -> TimeSlot {
        self.slot
    }

    /// Free-text note.
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Applied coupon, if any.
    pub fn coupon_id(&self) -> Option<Uuid> {
        self.coupon_id
    }

    /// Total price in minor currency units.
    pub fn total_price_cents(&self) -> i64 {
        self.total_price_cents
    }

    /// Lifecycle state.
    pub fn status(&self) -> ReservationStatus {
        self.status
    }
}
