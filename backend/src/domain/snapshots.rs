//! Immutable read-side projections returned by the snapshot reader.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::UserId;
use super::reservations::ReservationStatus;

/// A bookable resource as seen when a command starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub id: Uuid,
    pub name: String,
    /// Minimum minutes between "now" and the start of a new reservation.
    pub min_lead_minutes: u32,
    /// Price per hour in minor currency units.
    pub hourly_rate_cents: i64,
}

/// Discount carried by a coupon. Exactly one shape applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discount {
    /// Subtract a fixed amount in minor currency units.
    FixedAmount { amount_cents: i64 },
    /// Subtract a percentage (1 to 100) of the base price.
    Percentage { percent: u8 },
}

/// Validation errors for coupon snapshots loaded from storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponValidationError {
    #[error("coupon must define exactly one of a fixed amount or a percentage")]
    AmbiguousDiscount,
    #[error("fixed coupon amount must be positive")]
    NonPositiveAmount,
    #[error("coupon percentage must be between 1 and 100")]
    PercentageOutOfRange,
    #[error("coupon validity window must not be empty")]
    EmptyWindow,
}

impl Discount {
    /// Build a discount from the two nullable storage columns.
    pub fn from_parts(
        amount_cents: Option<i64>,
        percent: Option<i32>,
    ) -> Result<Self, CouponValidationError> {
        match (amount_cents, percent) {
            (Some(amount), None) if amount > 0 => Ok(Self::FixedAmount {
                amount_cents: amount,
            }),
            (Some(_), None) => Err(CouponValidationError::NonPositiveAmount),
            (None, Some(value)) => u8::try_from(value)
                .ok()
                .filter(|pct| (1..=100).contains(pct))
                .map(|pct| Self::Percentage { percent: pct })
                .ok_or(CouponValidationError::PercentageOutOfRange),
            _ => Err(CouponValidationError::AmbiguousDiscount),
        }
    }
}

/// A coupon valid over `[valid_from, valid_until)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponSnapshot {
    pub id: Uuid,
    pub code: String,
    pub discount: Discount,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl CouponSnapshot {
    /// Validate and construct a coupon snapshot.
    pub fn new(
        id: Uuid,
        code: impl Into<String>,
        discount: Discount,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Result<Self, CouponValidationError> {
        if valid_from >= valid_until {
            return Err(CouponValidationError::EmptyWindow);
        }
        Ok(Self {
            id,
            code: code.into(),
            discount,
            valid_from,
            valid_until,
        })
    }

    /// Whether the coupon may be redeemed at `instant`.
    pub fn is_valid_at(&self, instant: DateTime<Utc>) -> bool {
        self.valid_from <= instant && instant < self.valid_until
    }
}

/// Minimal reservation projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationSnapshot {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub user_id: UserId,
    pub status: ReservationStatus,
    pub end_time: DateTime<Utc>,
}

/// Full read-after-write projection returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationView {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub user_id: UserId,
    pub status: ReservationStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub note: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub total_price_cents: i64,
    pub created_at: DateTime<Utc>,
}
