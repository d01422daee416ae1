//! In-memory store implementing every persistence port.
//!
//! Transactions stage their writes and publish them atomically on commit.
//! Ledger keys inserted by an open transaction are claimed immediately, so a
//! concurrent transaction inserting the same (key, user) observes a conflict
//! and reads the claimed `processing` record, much as a second Postgres
//! writer would after waiting on the unique index. Reservations staged by an
//! open transaction likewise block overlapping slots in other transactions.
//!
//! Fault injection lets tests fail `begin`, `commit` and reservation writes
//! on demand.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::idempotency::{
    IdempotencyCompletion, IdempotencyKey, IdempotencyRecord, IdempotencyStatus, InsertOutcome,
    NewIdempotencyEntry,
};
use crate::domain::notifications::NotificationJob;
use crate::domain::ports::{
    IdempotencyLedger, IdempotencyLedgerError, IdempotencyMaintenance,
    IdempotencyMaintenanceError, IsolationLevel, NotificationWriteError, NotificationWriter,
    ReservationWriteError, ReservationWriter, SnapshotReadError, SnapshotReader,
    StoreTransaction, TransactionStore, TransactionStoreError,
};
use crate::domain::reservations::{Reservation, ReservationStatus};
use crate::domain::snapshots::{
    CouponSnapshot, ReservationSnapshot, ReservationView, ResourceSnapshot,
};

type LedgerKey = (String, Uuid);

fn ledger_key(key: &IdempotencyKey, user_id: &UserId) -> LedgerKey {
    (key.as_ref().to_owned(), *user_id.as_uuid())
}

/// Transaction lifecycle counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounters {
    pub begins: u32,
    pub commits: u32,
    pub rollbacks: u32,
}

#[derive(Debug, Clone)]
struct StoredReservation {
    reservation: Reservation,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreState {
    resources: HashMap<Uuid, ResourceSnapshot>,
    coupons: HashMap<String, CouponSnapshot>,
    reservations: HashMap<Uuid, StoredReservation>,
    ledger: HashMap<LedgerKey, IdempotencyRecord>,
    claims: HashMap<LedgerKey, (u64, IdempotencyRecord)>,
    pending_reservations: HashMap<u64, Vec<Reservation>>,
    jobs: Vec<NotificationJob>,
    next_tx_id: u64,
    counters: StoreCounters,
    begin_failures: VecDeque<TransactionStoreError>,
    commit_failures: VecDeque<TransactionStoreError>,
    reservation_failures: VecDeque<ReservationWriteError>,
}

impl StoreState {
    fn release(&mut self, tx_id: u64) {
        self.claims.retain(|_, (owner, _)| *owner != tx_id);
        self.pending_reservations.remove(&tx_id);
    }

    fn slot_taken(&self, candidate: &Reservation) -> bool {
        let clashes = |other: &Reservation| {
            other.resource_id() == candidate.resource_id()
                && other.status() != ReservationStatus::Cancelled
                && other.slot().overlaps(&candidate.slot())
        };
        self.reservations
            .values()
            .any(|stored| clashes(&stored.reservation))
            || self
                .pending_reservations
                .values()
                .flatten()
                .any(|pending| clashes(pending))
    }
}

struct Shared {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared in-memory booking store.
#[derive(Clone)]
pub struct InMemoryBookingStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryBookingStore {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl InMemoryBookingStore {
    /// Create an empty store stamping commits with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(StoreState::default()),
                clock,
            }),
        }
    }

    /// Seed a bookable resource.
    pub fn insert_resource(&self, resource: ResourceSnapshot) {
        self.shared.lock().resources.insert(resource.id, resource);
    }

    /// Seed a coupon.
    pub fn insert_coupon(&self, coupon: CouponSnapshot) {
        self.shared
            .lock()
            .coupons
            .insert(coupon.code.to_lowercase(), coupon);
    }

    /// Seed a committed reservation.
    pub fn insert_reservation(&self, reservation: Reservation, created_at: DateTime<Utc>) {
        self.shared.lock().reservations.insert(
            reservation.id(),
            StoredReservation {
                reservation,
                created_at,
            },
        );
    }

    /// Seed a committed ledger record.
    pub fn insert_ledger_record(&self, record: IdempotencyRecord) {
        let key = ledger_key(&record.key, &record.user_id);
        self.shared.lock().ledger.insert(key, record);
    }

    /// Fail the next `begin` with `error`.
    pub fn fail_next_begin(&self, error: TransactionStoreError) {
        self.shared.lock().begin_failures.push_back(error);
    }

    /// Fail the next `count` commits with a transient conflict.
    pub fn fail_next_commits(&self, count: usize) {
        let mut state = self.shared.lock();
        for _ in 0..count {
            state
                .commit_failures
                .push_back(TransactionStoreError::transient("could not serialize access"));
        }
    }

    /// Fail the next reservation write with `error`.
    pub fn fail_next_reservation_write(&self, error: ReservationWriteError) {
        self.shared.lock().reservation_failures.push_back(error);
    }

    /// Transaction lifecycle counts observed so far.
    pub fn counters(&self) -> StoreCounters {
        self.shared.lock().counters
    }

    /// Committed reservations, in no particular order.
    pub fn reservations(&self) -> Vec<Reservation> {
        self.shared
            .lock()
            .reservations
            .values()
            .map(|stored| stored.reservation.clone())
            .collect()
    }

    /// Committed notification jobs in commit order.
    pub fn notification_jobs(&self) -> Vec<NotificationJob> {
        self.shared.lock().jobs.clone()
    }

    /// Committed ledger record for (key, user).
    pub fn ledger_record(&self, key: &IdempotencyKey, user_id: &UserId) -> Option<IdempotencyRecord> {
        self.shared
            .lock()
            .ledger
            .get(&ledger_key(key, user_id))
            .cloned()
    }

    /// Number of ledger keys held by open transactions.
    pub fn open_claims(&self) -> usize {
        self.shared.lock().claims.len()
    }
}

#[async_trait]
impl TransactionStore for InMemoryBookingStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self, _isolation: IsolationLevel) -> Result<Self::Tx, TransactionStoreError> {
        let mut state = self.shared.lock();
        if let Some(error) = state.begin_failures.pop_front() {
            return Err(error);
        }
        state.counters.begins += 1;
        state.next_tx_id += 1;
        Ok(InMemoryTransaction {
            id: state.next_tx_id,
            shared: Arc::clone(&self.shared),
            staged_ledger: HashMap::new(),
            staged_jobs: Vec::new(),
            finished: false,
        })
    }
}

/// One open in-memory transaction.
pub struct InMemoryTransaction {
    id: u64,
    shared: Arc<Shared>,
    staged_ledger: HashMap<LedgerKey, IdempotencyRecord>,
    staged_jobs: Vec<NotificationJob>,
    finished: bool,
}

impl InMemoryTransaction {
    fn visible_record(&self, state: &StoreState, key: &LedgerKey) -> Option<IdempotencyRecord> {
        self.staged_ledger
            .get(key)
            .or_else(|| state.ledger.get(key))
            .or_else(|| state.claims.get(key).map(|(_, record)| record))
            .cloned()
    }

    fn claimed_by_other(&self, state: &StoreState, key: &LedgerKey) -> bool {
        state
            .claims
            .get(key)
            .is_some_and(|(owner, _)| *owner != self.id)
    }

    fn claim(&mut self, state: &mut StoreState, key: LedgerKey, record: IdempotencyRecord) {
        state.claims.insert(key.clone(), (self.id, record.clone()));
        self.staged_ledger.insert(key, record);
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.shared.lock().release(self.id);
        }
    }
}

#[async_trait]
impl IdempotencyLedger for InMemoryTransaction {
    async fn try_insert(
        &mut self,
        entry: &NewIdempotencyEntry,
    ) -> Result<InsertOutcome, IdempotencyLedgerError> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.lock();
        let key = ledger_key(&entry.key, &entry.user_id);
        if self.staged_ledger.contains_key(&key)
            || state.ledger.contains_key(&key)
            || state.claims.contains_key(&key)
        {
            return Ok(InsertOutcome::Conflict);
        }
        self.claim(&mut state, key, entry.to_processing_record());
        Ok(InsertOutcome::Inserted)
    }

    async fn get(
        &mut self,
        key: &IdempotencyKey,
        user_id: &UserId,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyLedgerError> {
        let state = self.shared.lock();
        Ok(self.visible_record(&state, &ledger_key(key, user_id)))
    }

    async fn mark_completed(
        &mut self,
        key: &IdempotencyKey,
        user_id: &UserId,
        completion: &IdempotencyCompletion,
    ) -> Result<(), IdempotencyLedgerError> {
        let lookup = ledger_key(key, user_id);
        let current = {
            let state = self.shared.lock();
            self.staged_ledger
                .get(&lookup)
                .or_else(|| state.ledger.get(&lookup))
                .cloned()
        };
        let Some(mut record) = current.filter(|r| r.status == IdempotencyStatus::Processing) else {
            return Err(IdempotencyLedgerError::query(
                "no processing record to complete",
            ));
        };
        record.status = IdempotencyStatus::Completed;
        record.result_hash = Some(completion.result_hash);
        record.result_reservation_id = Some(completion.reservation_id);
        self.staged_ledger.insert(lookup, record);
        Ok(())
    }

    async fn reclaim_expired(
        &mut self,
        entry: &NewIdempotencyEntry,
        now: DateTime<Utc>,
    ) -> Result<bool, IdempotencyLedgerError> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.lock();
        let key = ledger_key(&entry.key, &entry.user_id);
        if self.claimed_by_other(&state, &key) {
            return Ok(false);
        }
        let expired = state
            .ledger
            .get(&key)
            .is_some_and(|record| record.is_expired(now));
        if !expired {
            return Ok(false);
        }
        self.claim(&mut state, key, entry.to_processing_record());
        Ok(true)
    }
}

#[async_trait]
impl ReservationWriter for InMemoryTransaction {
    async fn create(&mut self, reservation: &Reservation) -> Result<(), ReservationWriteError> {
        let mut state = self.shared.lock();
        if let Some(error) = state.reservation_failures.pop_front() {
            return Err(error);
        }
        if !state.resources.contains_key(&reservation.resource_id()) {
            return Err(ReservationWriteError::missing_resource(
                reservation.resource_id().to_string(),
            ));
        }
        if state.slot_taken(reservation) {
            return Err(ReservationWriteError::slot_conflict(
                "overlapping reservation exists",
            ));
        }
        state
            .pending_reservations
            .entry(self.id)
            .or_default()
            .push(reservation.clone());
        Ok(())
    }
}

#[async_trait]
impl NotificationWriter for InMemoryTransaction {
    async fn create_job(&mut self, job: &NotificationJob) -> Result<(), NotificationWriteError> {
        self.staged_jobs.push(job.clone());
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn commit(mut self) -> Result<(), TransactionStoreError> {
        self.finished = true;
        let shared = Arc::clone(&self.shared);
        let mut state = shared.lock();
        if let Some(error) = state.commit_failures.pop_front() {
            state.release(self.id);
            return Err(error);
        }

        let now = shared.clock.utc();
        state.ledger.extend(self.staged_ledger.drain());
        let pending = state
            .pending_reservations
            .remove(&self.id)
            .unwrap_or_default();
        for reservation in pending {
            state.reservations.insert(
                reservation.id(),
                StoredReservation {
                    reservation,
                    created_at: now,
                },
            );
        }
        state.jobs.append(&mut self.staged_jobs);
        state.release(self.id);
        state.counters.commits += 1;
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), TransactionStoreError> {
        self.finished = true;
        let mut state = self.shared.lock();
        state.release(self.id);
        state.counters.rollbacks += 1;
        Ok(())
    }
}

#[async_trait]
impl SnapshotReader for InMemoryBookingStore {
    async fn resource_by_id(&self, id: Uuid) -> Result<Option<ResourceSnapshot>, SnapshotReadError> {
        Ok(self.shared.lock().resources.get(&id).cloned())
    }

    async fn coupon_by_code(&self, code: &str) -> Result<Option<CouponSnapshot>, SnapshotReadError> {
        Ok(self
            .shared
            .lock()
            .coupons
            .get(&code.to_lowercase())
            .cloned())
    }

    async fn reservation_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<ReservationSnapshot>, SnapshotReadError> {
        Ok(self.shared.lock().reservations.get(&id).map(|stored| {
            let reservation = &stored.reservation;
            ReservationSnapshot {
                id: reservation.id(),
                resource_id: reservation.resource_id(),
                user_id: reservation.user_id().clone(),
                status: reservation.status(),
                end_time: reservation.slot().end(),
            }
        }))
    }

    async fn reservation_view_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<ReservationView>, SnapshotReadError> {
        Ok(self.shared.lock().reservations.get(&id).map(|stored| {
            let reservation = &stored.reservation;
            ReservationView {
                id: reservation.id(),
                resource_id: reservation.resource_id(),
                user_id: reservation.user_id().clone(),
                status: reservation.status(),
                start_time: reservation.slot().start(),
                end_time: reservation.slot().end(),
                note: reservation.note().map(str::to_owned),
                coupon_id: reservation.coupon_id(),
                total_price_cents: reservation.total_price_cents(),
                created_at: stored.created_at,
            }
        }))
    }

    async fn idempotency_by_key(
        &self,
        key: &IdempotencyKey,
        user_id: &UserId,
    ) -> Result<Option<IdempotencyRecord>, SnapshotReadError> {
        Ok(self.ledger_record(key, user_id))
    }
}

#[async_trait]
impl IdempotencyMaintenance for InMemoryBookingStore {
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyMaintenanceError> {
        let mut state = self.shared.lock();
        let before = state.ledger.len();
        state.ledger.retain(|_, record| !record.is_expired(now));
        Ok(u64::try_from(before - state.ledger.len()).unwrap_or(u64::MAX))
    }
}
