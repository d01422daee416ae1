//! Raw reservation requests and their normalized, fingerprintable form.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::idempotency::{ContentHash, ContentHashError, canonicalize_and_hash};

use super::{ReservationValidationError, TimeSlot};

/// Maximum note length in characters, measured after trimming.
pub const NOTE_MAX_CHARS: usize = 500;

/// Reservation request as bound from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub resource_id: Uuid,
    /// RFC 3339 timestamp, any offset.
    pub start_time: String,
    /// RFC 3339 timestamp, any offset.
    pub end_time: String,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Request after parsing and normalization.
///
/// Two requests that normalize to equal values produce the same
/// fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedReservationRequest {
    resource_id: Uuid,
    slot: TimeSlot,
    coupon_code: Option<String>,
    note: Option<String>,
}

impl NormalizedReservationRequest {
    /// Parse timestamps, validate the slot and note, and normalize optional
    /// fields.
    ///
    /// Coupon codes are trimmed and lower-cased; notes are trimmed; blank
    /// values of either become absent.
    pub fn parse(request: &CreateReservationRequest) -> Result<Self, ReservationValidationError> {
        let start = parse_timestamp(&request.start_time, "start_time")?;
        let end = parse_timestamp(&request.end_time, "end_time")?;
        let slot = TimeSlot::new(start, end)?;

        let coupon_code = non_blank(request.coupon_code.as_deref()).map(str::to_lowercase);
        let note = non_blank(request.note.as_deref()).map(str::to_owned);
        if note
            .as_deref()
            .is_some_and(|text| text.chars().count() > NOTE_MAX_CHARS)
        {
            return Err(ReservationValidationError::NoteTooLong {
                max: NOTE_MAX_CHARS,
            });
        }

        Ok(Self {
            resource_id: request.resource_id,
            slot,
            coupon_code,
            note,
        })
    }

    /// Resource being booked.
    pub fn resource_id(&self) -> Uuid {
        self.resource_id
    }

    /// Validated time range.
    pub fn slot(&self) -> TimeSlot {
        self.slot
    }

    /// Lower-cased coupon code, if any.
    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    /// Trimmed note, absent when blank.
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Canonical JSON form hashed into the request fingerprint.
    pub fn canonical_payload(&self) -> serde_json::Value {
        json!({
            "resourceId": self.resource_id,
            "startTime": render_timestamp(self.slot.start()),
            "endTime": render_timestamp(self.slot.end()),
            "couponCode": self.coupon_code,
            "note": self.note,
        })
    }

    /// SHA-256 fingerprint of [`Self::canonical_payload`].
    pub fn fingerprint(&self) -> Result<ContentHash, ContentHashError> {
        canonicalize_and_hash(&self.canonical_payload())
    }
}

fn parse_timestamp(
    raw: &str,
    field: &'static str,
) -> Result<DateTime<Utc>, ReservationValidationError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| ReservationValidationError::InvalidTimestamp { field })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

/// UTC, microsecond precision, `Z` suffix.
pub(crate) fn render_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}
