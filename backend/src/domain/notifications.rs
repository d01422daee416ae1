//! Notification jobs enqueued alongside reservations.
//!
//! Jobs are rows polled by an external worker; this crate only writes them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::reservations::Reservation;

/// Job kind emitted when a reservation is created.
pub const RESERVATION_CREATED_KIND: &str = "reservation.created";
/// Topic carrying reservation notifications.
pub const RESERVATIONS_TOPIC: &str = "reservations";

/// Delivery state of a job. Only `queued` is ever written here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationJobStatus {
    Queued,
}

impl NotificationJobStatus {
    /// Returns the database string representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
        }
    }
}

/// A queued notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationJob {
    pub id: Uuid,
    pub kind: String,
    pub topic: String,
    /// Opaque payload bytes; JSON for the jobs built here.
    pub payload: Vec<u8>,
    pub run_at: DateTime<Utc>,
    pub status: NotificationJobStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReservationCreatedPayload<'a> {
    reservation_id: Uuid,
    user_id: &'a str,
    resource_id: Uuid,
    start_time: String,
}

impl NotificationJob {
    /// Build the `reservation.created` job for `reservation`, due at `now`.
    pub fn reservation_created(
        reservation: &Reservation,
        now: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_vec(&ReservationCreatedPayload {
            reservation_id: reservation.id(),
            user_id: reservation.user_id().as_ref(),
            resource_id: reservation.resource_id(),
            start_time: super::reservations::render_timestamp(reservation.slot().start()),
        })?;

        Ok(Self {
            id: Uuid::new_v4(),
            kind: RESERVATION_CREATED_KIND.to_owned(),
            topic: RESERVATIONS_TOPIC.to_owned(),
            payload,
            run_at: now,
            status: NotificationJobStatus::Queued,
        })
    }
}
