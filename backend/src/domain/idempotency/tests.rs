//! Unit tests for idempotency primitives.

use std::collections::HashMap;
use std::time::Duration;

use super::*;
use crate::domain::UserId;
use crate::domain::env::ConfigEnv;
use chrono::{TimeZone, Utc};
use rstest::rstest;
use serde_json::json;

struct MapEnv(HashMap<&'static str, &'static str>);

impl ConfigEnv for MapEnv {
    fn string(&self, name: &str) -> Option<String> {
        self.0.get(name).map(|value| (*value).to_owned())
    }
}

// IdempotencyKey tests

#[rstest]
#[case("550e8400-e29b-41d4-a716-446655440000")]
#[case("order-42/retry")]
#[case("k")]
fn idempotency_key_accepts_visible_ascii(#[case] input: &str) {
    let key = IdempotencyKey::new(input).expect("key should be accepted");
    assert_eq!(key.as_ref(), input);
}

#[rstest]
#[case("", IdempotencyKeyValidationError::EmptyKey)]
#[case(" 550e8400", IdempotencyKeyValidationError::InvalidCharacters)]
#[case("550e8400 ", IdempotencyKeyValidationError::InvalidCharacters)]
#[case("two words", IdempotencyKeyValidationError::InvalidCharacters)]
#[case("clé", IdempotencyKeyValidationError::InvalidCharacters)]
#[case("tab\tkey", IdempotencyKeyValidationError::InvalidCharacters)]
fn idempotency_key_rejects_invalid_input(
    #[case] input: &str,
    #[case] expected: IdempotencyKeyValidationError,
) {
    assert_eq!(IdempotencyKey::new(input), Err(expected));
}

#[test]
fn idempotency_key_enforces_length_limit() {
    let at_limit = "a".repeat(IDEMPOTENCY_KEY_MAX_LEN);
    assert!(IdempotencyKey::new(&at_limit).is_ok());

    let over_limit = "a".repeat(IDEMPOTENCY_KEY_MAX_LEN + 1);
    assert_eq!(
        IdempotencyKey::new(over_limit),
        Err(IdempotencyKeyValidationError::TooLong {
            max: IDEMPOTENCY_KEY_MAX_LEN
        })
    );
}

#[test]
fn idempotency_key_deserialization_validates() {
    let parsed: Result<IdempotencyKey, _> = serde_json::from_str("\"has space\"");
    assert!(parsed.is_err());
}

// ContentHash tests

#[test]
fn content_hash_display_matches_hex() {
    let hash = ContentHash::from_bytes([0xab; 32]);
    assert_eq!(format!("{hash}"), hash.to_hex());
    assert_eq!(hash.to_hex().len(), 64);
}

#[test]
fn content_hash_rejects_wrong_length() {
    assert_eq!(
        ContentHash::try_from_bytes(&[1, 2, 3]),
        Err(ContentHashError::InvalidLength {
            expected: 32,
            actual: 3
        })
    );
}

// Canonicalization tests

#[test]
fn canonicalize_and_hash_ignores_key_order() {
    let a = json!({"z": 1, "a": 2, "m": {"y": true, "b": null}});
    let b = json!({"a": 2, "m": {"b": null, "y": true}, "z": 1});
    assert_eq!(canonicalize_and_hash(&a), canonicalize_and_hash(&b));
}

#[test]
fn canonicalize_and_hash_preserves_array_order() {
    let a = json!({"arr": [1, 2, 3]});
    let b = json!({"arr": [3, 2, 1]});
    assert_ne!(canonicalize_and_hash(&a), canonicalize_and_hash(&b));
}

#[test]
fn canonicalize_and_hash_matches_sha256_of_compact_json() {
    use sha2::{Digest, Sha256};

    let value = json!({"b": "x", "a": 1});
    let expected: [u8; 32] = Sha256::digest(br#"{"a":1,"b":"x"}"#).into();
    let hash = canonicalize_and_hash(&value).expect("hash");
    assert_eq!(hash.as_bytes(), &expected);
}

// CommandEndpoint / status tests

#[test]
fn endpoint_round_trips_through_strings() {
    for endpoint in CommandEndpoint::ALL {
        assert_eq!(endpoint.as_str().parse(), Ok(endpoint));
    }
    assert!("reservations.delete".parse::<CommandEndpoint>().is_err());
}

#[rstest]
#[case("processing", IdempotencyStatus::Processing)]
#[case("completed", IdempotencyStatus::Completed)]
fn status_parses_database_values(#[case] raw: &str, #[case] expected: IdempotencyStatus) {
    assert_eq!(raw.parse(), Ok(expected));
    assert_eq!(expected.to_string(), raw);
}

#[test]
fn status_rejects_unknown_values() {
    assert!("failed".parse::<IdempotencyStatus>().is_err());
}

// Record tests

#[test]
fn record_expiry_is_inclusive() {
    let created = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).single().expect("valid time");
    let entry = NewIdempotencyEntry {
        key: IdempotencyKey::random(),
        user_id: UserId::random(),
        endpoint: CommandEndpoint::CreateReservation,
        request_hash: ContentHash::from_bytes([1; 32]),
        created_at: created,
        expires_at: created + chrono::TimeDelta::hours(1),
    };
    let record = entry.to_processing_record();

    assert_eq!(record.status, IdempotencyStatus::Processing);
    assert!(record.result_reservation_id.is_none());
    assert!(!record.is_expired(created + chrono::TimeDelta::minutes(59)));
    assert!(record.is_expired(created + chrono::TimeDelta::hours(1)));
}

// Config tests

#[rstest]
#[case(None, 24)]
#[case(Some("48"), 48)]
#[case(Some("0"), 1)]
#[case(Some("999999"), 87_600)]
#[case(Some("not-a-number"), 24)]
fn config_reads_and_clamps_ttl(#[case] raw: Option<&'static str>, #[case] hours: u64) {
    let env = MapEnv(
        raw.map(|value| HashMap::from([(IDEMPOTENCY_TTL_HOURS_ENV, value)]))
            .unwrap_or_default(),
    );
    let config = IdempotencyConfig::from_env_with(&env);
    assert_eq!(config.ttl(), Duration::from_secs(hours * 3600));
}

#[test]
fn config_computes_expiry_from_now() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single().expect("valid time");
    let config = IdempotencyConfig::with_ttl(Duration::from_secs(2 * 3600));
    assert_eq!(config.expires_at(now), now + chrono::TimeDelta::hours(2));
}
