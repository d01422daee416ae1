//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain snapshots validate
//! every column and report the first offending one.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::idempotency::{
    CommandEndpoint, ContentHash, IdempotencyKey, IdempotencyRecord, IdempotencyStatus,
    NewIdempotencyEntry,
};
use crate::domain::notifications::NotificationJob;
use crate::domain::reservations::{Reservation, ReservationStatus};
use crate::domain::snapshots::{
    CouponSnapshot, Discount, ReservationSnapshot, ReservationView, ResourceSnapshot,
};

use super::schema::{coupons, idempotency_records, notification_jobs, reservations, resources};

/// A stored column that cannot be mapped into its domain type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {column}: {message}")]
pub(crate) struct InvalidRow {
    pub column: &'static str,
    pub message: String,
}

impl InvalidRow {
    fn new(column: &'static str, err: impl ToString) -> Self {
        Self {
            column,
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resources and coupons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = resources)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ResourceRow {
    pub id: Uuid,
    pub name: String,
    pub min_lead_minutes: i32,
    pub hourly_rate_cents: i64,
}

impl TryFrom<ResourceRow> for ResourceSnapshot {
    type Error = InvalidRow;

    fn try_from(row: ResourceRow) -> Result<Self, Self::Error> {
        let min_lead_minutes = u32::try_from(row.min_lead_minutes)
            .map_err(|err| InvalidRow::new("resources.min_lead_minutes", err))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            min_lead_minutes,
            hourly_rate_cents: row.hourly_rate_cents,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CouponRow {
    pub id: Uuid,
    pub code: String,
    pub amount_off_cents: Option<i64>,
    pub percent_off: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl TryFrom<CouponRow> for CouponSnapshot {
    type Error = InvalidRow;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let discount = Discount::from_parts(row.amount_off_cents, row.percent_off)
            .map_err(|err| InvalidRow::new("coupons.discount", err))?;
        CouponSnapshot::new(row.id, row.code, discount, row.valid_from, row.valid_until)
            .map_err(|err| InvalidRow::new("coupons.valid_until", err))
    }
}

// ---------------------------------------------------------------------------
// Reservations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reservations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReservationRow {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub note: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub total_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl ReservationRow {
    fn parsed_status(&self) -> Result<ReservationStatus, InvalidRow> {
        self.status
            .parse()
            .map_err(|err| InvalidRow::new("reservations.status", err))
    }
}

impl TryFrom<ReservationRow> for ReservationSnapshot {
    type Error = InvalidRow;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: row.parsed_status()?,
            id: row.id,
            resource_id: row.resource_id,
            user_id: UserId::from_uuid(row.user_id),
            end_time: row.end_at,
        })
    }
}

impl TryFrom<ReservationRow> for ReservationView {
    type Error = InvalidRow;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: row.parsed_status()?,
            id: row.id,
            resource_id: row.resource_id,
            user_id: UserId::from_uuid(row.user_id),
            start_time: row.start_at,
            end_time: row.end_at,
            note: row.note,
            coupon_id: row.coupon_id,
            total_price_cents: row.total_price_cents,
            created_at: row.created_at,
        })
    }
}

/// Insertable reservation. `created_at` takes the column default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reservations)]
pub(crate) struct NewReservationRow<'a> {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub user_id: Uuid,
    pub status: &'static str,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub note: Option<&'a str>,
    pub coupon_id: Option<Uuid>,
    pub total_price_cents: i64,
}

impl<'a> From<&'a Reservation> for NewReservationRow<'a> {
    fn from(reservation: &'a Reservation) -> Self {
        let slot = reservation.slot();
        Self {
            id: reservation.id(),
            resource_id: reservation.resource_id(),
            user_id: *reservation.user_id().as_uuid(),
            status: reservation.status().as_str(),
            start_at: slot.start(),
            end_at: slot.end(),
            note: reservation.note(),
            coupon_id: reservation.coupon_id(),
            total_price_cents: reservation.total_price_cents(),
        }
    }
}

// ---------------------------------------------------------------------------
// Idempotency ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = idempotency_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct IdempotencyRecordRow {
    pub key: String,
    pub user_id: Uuid,
    pub endpoint: String,
    pub status: String,
    pub request_hash: Vec<u8>,
    pub result_hash: Option<Vec<u8>>,
    pub result_reservation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<IdempotencyRecordRow> for IdempotencyRecord {
    type Error = InvalidRow;

    fn try_from(row: IdempotencyRecordRow) -> Result<Self, Self::Error> {
        let key = IdempotencyKey::new(&row.key)
            .map_err(|err| InvalidRow::new("idempotency_records.key", err))?;
        let endpoint: CommandEndpoint = row
            .endpoint
            .parse()
            .map_err(|err| InvalidRow::new("idempotency_records.endpoint", err))?;
        let status: IdempotencyStatus = row
            .status
            .parse()
            .map_err(|err| InvalidRow::new("idempotency_records.status", err))?;
        let request_hash = ContentHash::try_from_bytes(&row.request_hash)
            .map_err(|err| InvalidRow::new("idempotency_records.request_hash", err))?;
        let result_hash = row
            .result_hash
            .as_deref()
            .map(ContentHash::try_from_bytes)
            .transpose()
            .map_err(|err| InvalidRow::new("idempotency_records.result_hash", err))?;

        Ok(Self {
            key,
            user_id: UserId::from_uuid(row.user_id),
            endpoint,
            status,
            request_hash,
            result_hash,
            result_reservation_id: row.result_reservation_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

/// Insertable `processing` ledger record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = idempotency_records)]
pub(crate) struct NewIdempotencyRecordRow<'a> {
    pub key: &'a str,
    pub user_id: Uuid,
    pub endpoint: &'static str,
    pub status: &'static str,
    pub request_hash: &'a [u8],
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<'a> From<&'a NewIdempotencyEntry> for NewIdempotencyRecordRow<'a> {
    fn from(entry: &'a NewIdempotencyEntry) -> Self {
        Self {
            key: entry.key.as_ref(),
            user_id: *entry.user_id.as_uuid(),
            endpoint: entry.endpoint.as_str(),
            status: IdempotencyStatus::Processing.as_str(),
            request_hash: entry.request_hash.as_bytes(),
            created_at: entry.created_at,
            expires_at: entry.expires_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Notification jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notification_jobs)]
pub(crate) struct NewNotificationJobRow<'a> {
    pub id: Uuid,
    pub kind: &'a str,
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub run_at: DateTime<Utc>,
    pub status: &'static str,
}

impl<'a> From<&'a NotificationJob> for NewNotificationJobRow<'a> {
    fn from(job: &'a NotificationJob) -> Self {
        Self {
            id: job.id,
            kind: &job.kind,
            topic: &job.topic,
            payload: &job.payload,
            run_at: job.run_at,
            status: job.status.as_str(),
        }
    }
}
