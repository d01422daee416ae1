//! Price quotation and lead-time policy.

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::snapshots::{CouponSnapshot, Discount, ResourceSnapshot};

use super::{ReservationValidationError, TimeSlot};

const SECONDS_PER_HOUR: i128 = 3600;

/// Reject slots starting sooner than the resource's minimum lead time.
///
/// A start exactly `min_lead_minutes` after `now` is accepted.
pub fn ensure_lead_time(
    resource: &ResourceSnapshot,
    slot: TimeSlot,
    now: DateTime<Utc>,
) -> Result<(), ReservationValidationError> {
    let minimum = TimeDelta::minutes(i64::from(resource.min_lead_minutes));
    if slot.start() - now < minimum {
        return Err(ReservationValidationError::LeadTimeTooShort {
            minimum_minutes: resource.min_lead_minutes,
        });
    }
    Ok(())
}

/// Price a slot in minor currency units.
///
/// The base price is the hourly rate pro-rated to the slot length, rounded
/// up. A fixed discount is subtracted and floored at zero; a percentage
/// discount takes `floor(base * percent / 100)` off.
pub fn quote_price(
    resource: &ResourceSnapshot,
    slot: TimeSlot,
    coupon: Option<&CouponSnapshot>,
) -> Result<i64, ReservationValidationError> {
    let rate = i128::from(resource.hourly_rate_cents);
    let seconds = i128::from(slot.duration_seconds());
    let base = ceil_div(rate * seconds, SECONDS_PER_HOUR);

    let total = match coupon.map(|c| c.discount) {
        None => base,
        Some(Discount::FixedAmount { amount_cents }) => (base - i128::from(amount_cents)).max(0),
        Some(Discount::Percentage { percent }) => {
            let discount = base * i128::from(percent) / 100;
            base - discount
        }
    };

    if total < 0 {
        return Err(ReservationValidationError::NegativePrice);
    }
    i64::try_from(total).map_err(|_| ReservationValidationError::PriceOverflow)
}

fn ceil_div(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    if numerator % denominator > 0 {
        quotient + 1
    } else {
        quotient
    }
}
