//! Content hashing and canonicalization helpers.

use std::fmt;

use sha2::{Digest, Sha256};

/// Errors raised while building a [`ContentHash`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentHashError {
    /// The byte slice had an incorrect length.
    #[error("content hash must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        actual: usize,
    },
    /// Failed to serialise the canonical JSON payload.
    #[error("failed to serialise canonical JSON payload: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },
}

/// SHA-256 hash of a canonicalized payload.
///
/// Two requests with the same idempotency key are "the same request" exactly
/// when their fingerprints are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Construct a [`ContentHash`] from raw bytes, typically loaded from
    /// storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    ///
    /// # Example
    ///
    /// ```
    /// # use booking_backend::domain::idempotency::ContentHash;
    /// let bytes = vec![0u8; 32];
    /// let hash = ContentHash::try_from_bytes(&bytes).expect("valid hash bytes");
    /// assert_eq!(hash.as_bytes(), &[0u8; 32]);
    /// assert!(ContentHash::try_from_bytes(&[0u8; 4]).is_err());
    /// ```
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, ContentHashError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ContentHashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Construct a [`ContentHash`] from a 32-byte array.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Access the raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode the hash as a lowercase hexadecimal string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Canonicalize a JSON value and compute its SHA-256 hash.
///
/// 1. Object keys are sorted recursively (lexicographic).
/// 2. Arrays preserve element order.
/// 3. The result is serialized to compact JSON (no whitespace).
/// 4. SHA-256 is computed on the resulting UTF-8 bytes.
///
/// # Example
///
/// ```
/// # use booking_backend::domain::idempotency::canonicalize_and_hash;
/// # use serde_json::json;
/// let a = json!({"b": 2, "a": 1});
/// let b = json!({"a": 1, "b": 2});
/// let hash_a = canonicalize_and_hash(&a).expect("hash A");
/// let hash_b = canonicalize_and_hash(&b).expect("hash B");
/// assert_eq!(hash_a, hash_b);
/// ```
pub fn canonicalize_and_hash(value: &serde_json::Value) -> Result<ContentHash, ContentHashError> {
    let canonical = canonicalize(value);
    let json_bytes =
        serde_json::to_vec(&canonical).map_err(|err| ContentHashError::Serialization {
            message: err.to_string(),
        })?;
    let digest: [u8; 32] = Sha256::digest(&json_bytes).into();
    Ok(ContentHash::from_bytes(digest))
}

fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(k, _)| k.as_str());
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize).collect())
        }
        other => other.clone(),
    }
}
