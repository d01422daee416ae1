//! Tests for error construction, classification and cause chaining.

use std::error::Error as _;

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
fn invalid_request_constructor_sets_code() {
    let err = Error::invalid_request("bad");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), "bad");
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
#[case(Error::transient("serialization failure"), true)]
#[case(Error::in_progress("still running"), false)]
#[case(Error::reservation_conflict("overlap"), false)]
#[case(Error::service_unavailable("pool"), false)]
#[case(Error::cancelled(), false)]
fn only_transient_conflicts_are_retryable(#[case] err: Error, #[case] expected: bool) {
    assert_eq!(err.is_transient(), expected);
}

#[rstest]
fn retries_exhausted_wraps_cause_and_counts_attempts() {
    let cause = Error::transient("deadlock detected");
    let err = Error::retries_exhausted(4, cause.clone());

    assert_eq!(err.code(), ErrorCode::RetriesExhausted);
    assert_eq!(err.details(), Some(&json!({ "attempts": 4 })));
    assert_eq!(err.cause(), Some(&cause));
    let source = err.source().expect("cause is exposed as source");
    assert_eq!(source.to_string(), "deadlock detected");
    assert!(!err.is_transient());
}

#[rstest]
#[case(ErrorCode::InvalidRequest, "invalid_request")]
#[case(ErrorCode::ReservationConflict, "reservation_conflict")]
#[case(ErrorCode::DuplicateRequest, "duplicate_request")]
#[case(ErrorCode::RetriesExhausted, "retries_exhausted")]
#[case(ErrorCode::ServiceUnavailable, "service_unavailable")]
fn error_codes_serialize_as_snake_case(#[case] code: ErrorCode, #[case] expected: &str) {
    let value = serde_json::to_value(code).expect("error code serializes");
    assert_eq!(value, json!(expected));
    assert_eq!(code.to_string(), expected);
}

#[rstest]
fn display_uses_message() {
    let err = Error::not_found("resource missing").with_details(json!({ "resourceId": "x" }));
    assert_eq!(err.to_string(), "resource missing");
}
