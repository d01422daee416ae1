//! End-to-end reservation workflow tests against the in-memory store.
//!
//! These drive `CreateReservationService` only through its public surface:
//! the `ReservationCommand` port, the snapshot reader and the store's
//! inspection helpers.

use std::sync::Arc;

use booking_backend::domain::idempotency::{IdempotencyKey, IdempotencyStatus};
use booking_backend::domain::ports::{CreateReservationCommand, ReservationCommand, SnapshotReader};
use booking_backend::domain::reservations::{CreateReservationRequest, ReservationStatus};
use booking_backend::domain::snapshots::ResourceSnapshot;
use booking_backend::domain::transaction::TransactionRuntime;
use booking_backend::domain::{
    CreateReservationService, ErrorCode, TransactionConfig, TransactionCoordinator, UserId,
};
use booking_backend::test_support::{
    FixtureClock, InMemoryBookingStore, NoJitter, RecordingSleeper,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use futures::future::join_all;
use rstest::{fixture, rstest};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type Service = CreateReservationService<InMemoryBookingStore, InMemoryBookingStore>;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0)
        .single()
        .expect("valid fixture time")
}

struct World {
    store: InMemoryBookingStore,
    sleeper: Arc<RecordingSleeper>,
    service: Arc<Service>,
    resource_id: Uuid,
}

#[fixture]
fn world() -> World {
    let clock = Arc::new(FixtureClock(now()));
    let store = InMemoryBookingStore::new(clock.clone());
    let resource_id = Uuid::new_v4();
    store.insert_resource(ResourceSnapshot {
        id: resource_id,
        name: "Rehearsal room".to_owned(),
        min_lead_minutes: 30,
        hourly_rate_cents: 4000,
    });

    let sleeper = Arc::new(RecordingSleeper::default());
    let coordinator = TransactionCoordinator::with_runtime(
        Arc::new(store.clone()),
        TransactionConfig::default(),
        TransactionRuntime {
            sleeper: sleeper.clone(),
            jitter: Arc::new(NoJitter),
        },
    );
    let service = CreateReservationService::with_noop_metrics(
        coordinator,
        Arc::new(store.clone()),
        clock,
    );

    World {
        store,
        sleeper,
        service: Arc::new(service),
        resource_id,
    }
}

impl World {
    fn command(&self, user_id: &UserId, key: &str, start_hours: i64) -> CreateReservationCommand {
        let start = now() + TimeDelta::hours(start_hours);
        CreateReservationCommand {
            request: CreateReservationRequest {
                resource_id: self.resource_id,
                start_time: start.to_rfc3339(),
                end_time: (start + TimeDelta::hours(1)).to_rfc3339(),
                coupon_code: None,
                note: Some("band practice".to_owned()),
            },
            user_id: user_id.clone(),
            idempotency_key: IdempotencyKey::new(key).expect("valid key"),
        }
    }
}

#[rstest]
#[tokio::test]
async fn sequential_retries_replay_one_reservation(world: World) {
    let user = UserId::random();
    let cancel = CancellationToken::new();

    let mut results = Vec::new();
    for _ in 0..4 {
        results.push(
            world
                .service
                .create_reservation(&cancel, world.command(&user, "retry-me", 2))
                .await
                .expect("submission succeeds"),
        );
    }

    let first = results.first().expect("four results");
    assert!(!first.is_replayed);
    assert!(results.iter().all(|r| r.reservation_id == first.reservation_id));
    assert_eq!(results.iter().filter(|r| r.is_replayed).count(), 3);
    assert_eq!(world.store.reservations().len(), 1);
    assert_eq!(world.store.notification_jobs().len(), 1);

    let view = world
        .store
        .reservation_view_by_id(first.reservation_id)
        .await
        .expect("read succeeds")
        .expect("reservation exists");
    assert_eq!(view.total_price_cents, 4000);
    assert_eq!(view.note.as_deref(), Some("band practice"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_submissions_have_one_winner(world: World) {
    let user = UserId::random();
    let submissions = (0..8).map(|_| {
        let service = Arc::clone(&world.service);
        let command = world.command(&user, "race", 3);
        tokio::spawn(async move {
            service
                .create_reservation(&CancellationToken::new(), command)
                .await
        })
    });

    let outcomes: Vec<_> = join_all(submissions)
        .await
        .into_iter()
        .map(|joined| joined.expect("task completes"))
        .collect();

    let created: Vec<_> = outcomes
        .iter()
        .filter_map(|o| o.as_ref().ok())
        .filter(|r| !r.is_replayed)
        .collect();
    assert_eq!(created.len(), 1, "exactly one submission creates");
    let winner = created.first().map(|r| r.reservation_id);

    for outcome in &outcomes {
        match outcome {
            Ok(result) => assert_eq!(Some(result.reservation_id), winner),
            Err(err) => assert_eq!(err.code(), ErrorCode::InProgress),
        }
    }
    assert_eq!(world.store.reservations().len(), 1);
    assert_eq!(world.store.open_claims(), 0);
}

#[rstest]
#[tokio::test]
async fn keys_are_scoped_per_user(world: World) {
    let cancel = CancellationToken::new();
    let alice = UserId::random();
    let bob = UserId::random();

    let first = world
        .service
        .create_reservation(&cancel, world.command(&alice, "shared-key", 2))
        .await
        .expect("alice books");
    let second = world
        .service
        .create_reservation(&cancel, world.command(&bob, "shared-key", 4))
        .await
        .expect("bob books");

    assert!(!second.is_replayed);
    assert_ne!(first.reservation_id, second.reservation_id);
    assert_eq!(world.store.reservations().len(), 2);
}

#[rstest]
#[tokio::test]
async fn reused_key_with_new_slot_is_a_duplicate_request(world: World) {
    let cancel = CancellationToken::new();
    let user = UserId::random();
    world
        .service
        .create_reservation(&cancel, world.command(&user, "order-7", 2))
        .await
        .expect("first submission");

    let err = world
        .service
        .create_reservation(&cancel, world.command(&user, "order-7", 5))
        .await
        .expect_err("payload differs");

    assert_eq!(err.code(), ErrorCode::DuplicateRequest);
    assert_eq!(world.store.reservations().len(), 1);
}

#[rstest]
#[tokio::test]
async fn commit_conflicts_on_every_attempt_exhaust_retries(world: World) {
    let user = UserId::random();
    world.store.fail_next_commits(4);

    let err = world
        .service
        .create_reservation(&CancellationToken::new(), world.command(&user, "doomed", 2))
        .await
        .expect_err("retries exhaust");

    assert_eq!(err.code(), ErrorCode::RetriesExhausted);
    assert_eq!(world.sleeper.recorded().len(), 3);
    assert!(world.store.reservations().is_empty());
    assert!(world.store.notification_jobs().is_empty());
    let key = IdempotencyKey::new("doomed").expect("valid key");
    assert!(world.store.ledger_record(&key, &user).is_none());
}

#[rstest]
#[tokio::test]
async fn one_commit_conflict_is_absorbed(world: World) {
    let user = UserId::random();
    world.store.fail_next_commits(1);

    let result = world
        .service
        .create_reservation(&CancellationToken::new(), world.command(&user, "bumpy", 2))
        .await
        .expect("second attempt commits");

    assert!(!result.is_replayed);
    assert_eq!(world.sleeper.recorded().len(), 1);
    let key = IdempotencyKey::new("bumpy").expect("valid key");
    let record = world
        .store
        .idempotency_by_key(&key, &user)
        .await
        .expect("read succeeds")
        .expect("ledger record committed");
    assert_eq!(record.status, IdempotencyStatus::Completed);
    assert_eq!(record.result_reservation_id, Some(result.reservation_id));
}

#[rstest]
#[tokio::test]
async fn cancelled_caller_gets_cancelled(world: World) {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = world
        .service
        .create_reservation(&cancel, world.command(&UserId::random(), "late", 2))
        .await
        .expect_err("cancelled");

    assert_eq!(err.code(), ErrorCode::Cancelled);
    assert!(world.store.reservations().is_empty());
}

#[rstest]
#[tokio::test]
async fn created_reservation_reads_back_as_pending_snapshot(world: World) {
    let user = UserId::random();
    let command = world.command(&user, "read-back", 2);
    let expected_end: DateTime<Utc> = command.request.end_time.parse().expect("rfc3339 end");

    let result = world
        .service
        .create_reservation(&CancellationToken::new(), command)
        .await
        .expect("reservation created");

    let snapshot = world
        .store
        .reservation_by_id(result.reservation_id)
        .await
        .expect("read succeeds")
        .expect("reservation exists");
    assert_eq!(snapshot.id, result.reservation_id);
    assert_eq!(snapshot.status, ReservationStatus::Pending);
    assert_eq!(snapshot.resource_id, world.resource_id);
    assert_eq!(snapshot.user_id, user);
    assert_eq!(snapshot.end_time, expected_end);

    let missing = world
        .store
        .reservation_by_id(Uuid::new_v4())
        .await
        .expect("read succeeds");
    assert!(missing.is_none());
}
