//! Ledger arbitration deciding whether an attempt may execute.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::idempotency::{IdempotencyStatus, InsertOutcome, NewIdempotencyEntry};
use crate::domain::ports::IdempotencyLedger;

use super::mapping::map_ledger_error;

/// Decision reached for one (key, user) inside an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Arbitration {
    /// This attempt owns the key and must execute the command.
    Fresh,
    /// An identical request already completed.
    Replay {
        reservation_id: Uuid,
        first_seen: DateTime<Utc>,
    },
    /// The key was used for a different request.
    DuplicatePayload { first_seen: DateTime<Utc> },
    /// An identical request is still executing elsewhere.
    InProgress,
}

/// Claim the entry's key or classify the record already holding it.
///
/// A record that vanished between the conflicting insert and the read means
/// its writer rolled back; the attempt is reported transient so the
/// coordinator retries it.
pub(super) async fn arbitrate<L>(
    ledger: &mut L,
    entry: &NewIdempotencyEntry,
    now: DateTime<Utc>,
) -> Result<Arbitration, Error>
where
    L: IdempotencyLedger + ?Sized,
{
    if ledger.try_insert(entry).await.map_err(map_ledger_error)? == InsertOutcome::Inserted {
        debug!("idempotency key claimed");
        return Ok(Arbitration::Fresh);
    }

    let Some(record) = ledger
        .get(&entry.key, &entry.user_id)
        .await
        .map_err(map_ledger_error)?
    else {
        debug!("conflicting idempotency record vanished");
        return Err(Error::transient(
            "idempotency record disappeared after a conflicting insert",
        ));
    };

    if record.is_expired(now) {
        let reclaimed = ledger
            .reclaim_expired(entry, now)
            .await
            .map_err(map_ledger_error)?;
        debug!(reclaimed, "expired idempotency record found");
        return Ok(if reclaimed {
            Arbitration::Fresh
        } else {
            Arbitration::InProgress
        });
    }

    if record.endpoint != entry.endpoint || record.request_hash != entry.request_hash {
        debug!(status = %record.status, "idempotency key reused with a different request");
        return Ok(Arbitration::DuplicatePayload {
            first_seen: record.created_at,
        });
    }

    match (record.status, record.result_reservation_id) {
        (IdempotencyStatus::Completed, Some(reservation_id)) => {
            debug!(%reservation_id, "replaying completed request");
            Ok(Arbitration::Replay {
                reservation_id,
                first_seen: record.created_at,
            })
        }
        (IdempotencyStatus::Completed, None) => Err(Error::internal(
            "completed idempotency record has no reservation id",
        )),
        (IdempotencyStatus::Processing, _) => {
            debug!("identical request still processing");
            Ok(Arbitration::InProgress)
        }
    }
}
