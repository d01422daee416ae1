//! Idempotency primitives for safe command retries.
//!
//! - [`IdempotencyKey`]: client-generated token reused verbatim across
//!   retries of the same logical request.
//! - [`ContentHash`]: SHA-256 digest of a canonicalized payload, used both
//!   as the request fingerprint and as the stored result hash.
//! - [`IdempotencyRecord`]: ledger row linking a key and user to the
//!   fingerprint and, once completed, the produced reservation.
//! - [`CommandEndpoint`]: discriminator of the protected command.
//! - [`IdempotencyConfig`]: ledger TTL configuration.
//!
//! # Payload Canonicalization
//!
//! To ensure semantically equivalent payloads produce identical hashes
//! regardless of key ordering, payloads are canonicalized before hashing:
//!
//! 1. JSON objects have their keys sorted recursively.
//! 2. The result is serialized to compact JSON (no whitespace).
//! 3. The SHA-256 hash is computed on the resulting bytes.

mod config;
mod endpoint;
mod key;
mod payload;
mod record;

pub use config::{IDEMPOTENCY_TTL_HOURS_ENV, IdempotencyConfig};
pub use endpoint::{CommandEndpoint, ParseCommandEndpointError};
pub use key::{IDEMPOTENCY_KEY_MAX_LEN, IdempotencyKey, IdempotencyKeyValidationError};
pub use payload::{ContentHash, ContentHashError, canonicalize_and_hash};
pub use record::{
    IdempotencyCompletion, IdempotencyRecord, IdempotencyStatus, InsertOutcome,
    NewIdempotencyEntry, ParseIdempotencyStatusError,
};

#[cfg(test)]
mod tests;
