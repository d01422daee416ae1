//! Domain-level error types.
//!
//! These errors are transport agnostic. Driving adapters map them to
//! whatever envelope their protocol needs; the stable [`ErrorCode`] is the
//! part callers are expected to branch on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// A referenced resource, coupon or reservation does not exist.
    NotFound,
    /// The requested slot overlaps an existing reservation.
    ReservationConflict,
    /// The idempotency key was reused with a different payload.
    DuplicateRequest,
    /// Another attempt with the same key is still being processed.
    InProgress,
    /// The store reported a retryable conflict (serialization or deadlock).
    TransientConflict,
    /// Transient conflicts persisted across every permitted attempt.
    RetriesExhausted,
    /// An unexpected error occurred inside the domain.
    InternalError,
    /// The backing store is unreachable.
    ServiceUnavailable,
    /// The caller cancelled the operation.
    Cancelled,
}

impl ErrorCode {
    /// Snake-case identifier matching the serialized form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::NotFound => "not_found",
            Self::ReservationConflict => "reservation_conflict",
            Self::DuplicateRequest => "duplicate_request",
            Self::InProgress => "in_progress",
            Self::TransientConflict => "transient_conflict",
            Self::RetriesExhausted => "retries_exhausted",
            Self::InternalError => "internal_error",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` must be non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use booking_backend::domain::{Error, ErrorCode};
///
/// let err = Error::new(ErrorCode::NotFound, "missing");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    code: ErrorCode,
    message: String,
    details: Option<Value>,
    cause: Option<Box<Error>>,
}

/// Validation errors emitted by the constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorValidationError {
    #[error("error message must not be empty")]
    EmptyMessage,
}

impl Error {
    /// Create a new error, panicking if validation fails.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        match Self::try_new(code, message) {
            Ok(value) => value,
            Err(err) => panic!("error messages must satisfy validation: {err}"),
        }
    }

    /// Fallible constructor that validates the message content.
    pub fn try_new(code: ErrorCode, message: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            details: None,
            cause: None,
        })
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary error details for adapters.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// The error this one wraps, if any.
    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_deref()
    }

    /// Whether the transaction coordinator may retry the failed attempt.
    pub fn is_transient(&self) -> bool {
        self.code == ErrorCode::TransientConflict
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use booking_backend::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_request("bad").with_details(json!({ "field": "note" }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Wrap an underlying error, exposed through [`std::error::Error::source`].
    pub fn with_cause(mut self, cause: Error) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::ReservationConflict`].
    pub fn reservation_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ReservationConflict, message)
    }

    /// Convenience constructor for [`ErrorCode::DuplicateRequest`].
    pub fn duplicate_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DuplicateRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::InProgress`].
    pub fn in_progress(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InProgress, message)
    }

    /// Convenience constructor for [`ErrorCode::TransientConflict`].
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransientConflict, message)
    }

    /// Build the error surfaced once every attempt failed transiently.
    ///
    /// The final cause is retained and the attempt count is recorded in the
    /// details payload.
    pub fn retries_exhausted(attempts: u32, cause: Error) -> Self {
        Self::new(
            ErrorCode::RetriesExhausted,
            format!("transaction failed after {attempts} attempts"),
        )
        .with_details(serde_json::json!({ "attempts": attempts }))
        .with_cause(cause)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::Cancelled`].
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "operation cancelled")
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests;
