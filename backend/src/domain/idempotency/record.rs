//! Ledger records and the inputs and outcomes of ledger operations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::super::UserId;
use super::{CommandEndpoint, ContentHash, IdempotencyKey};

/// Lifecycle state of a ledger record.
///
/// Records move from `Processing` to `Completed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdempotencyStatus {
    /// An attempt owns the key and has not yet committed a result.
    Processing,
    /// The command finished; the stored result is authoritative.
    Completed,
}

impl IdempotencyStatus {
    /// Returns the database string representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for IdempotencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid idempotency status '{input}'")]
pub struct ParseIdempotencyStatusError {
    /// The invalid input string.
    pub input: String,
}

impl FromStr for IdempotencyStatus {
    type Err = ParseIdempotencyStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            other => Err(ParseIdempotencyStatusError {
                input: other.to_owned(),
            }),
        }
    }
}

/// Stored ledger record for one (key, user) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    /// The idempotency key provided by the client.
    pub key: IdempotencyKey,
    /// User who made the original request.
    pub user_id: UserId,
    /// Command protected by this record.
    pub endpoint: CommandEndpoint,
    /// Current lifecycle state.
    pub status: IdempotencyStatus,
    /// Fingerprint of the normalized request.
    pub request_hash: ContentHash,
    /// Hash of the result payload, set on completion.
    pub result_hash: Option<ContentHash>,
    /// Reservation produced by the command, set on completion.
    pub result_reservation_id: Option<Uuid>,
    /// When the owning attempt inserted the record.
    pub created_at: DateTime<Utc>,
    /// Instant after which the record is logically absent.
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Whether the record is past its expiry at `now`.
    ///
    /// The expiry instant itself counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Values written by the first insert for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdempotencyEntry {
    /// The idempotency key provided by the client.
    pub key: IdempotencyKey,
    /// User issuing the command.
    pub user_id: UserId,
    /// Command being protected.
    pub endpoint: CommandEndpoint,
    /// Fingerprint of the normalized request.
    pub request_hash: ContentHash,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

impl NewIdempotencyEntry {
    /// Project the entry as the `processing` record it creates.
    pub fn to_processing_record(&self) -> IdempotencyRecord {
        IdempotencyRecord {
            key: self.key.clone(),
            user_id: self.user_id.clone(),
            endpoint: self.endpoint,
            status: IdempotencyStatus::Processing,
            request_hash: self.request_hash,
            result_hash: None,
            result_reservation_id: None,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Outcome of [`crate::domain::ports::IdempotencyLedger::try_insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// This attempt owns the key.
    Inserted,
    /// A record for (key, user) already exists.
    Conflict,
}

/// Result recorded when a command completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdempotencyCompletion {
    /// Hash of the result payload.
    pub result_hash: ContentHash,
    /// Reservation produced by the command.
    pub reservation_id: Uuid,
}
