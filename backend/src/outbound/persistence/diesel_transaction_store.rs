//! PostgreSQL-backed transaction store.
//!
//! [`DieselTransactionStore::begin`] checks out an owned pooled connection,
//! opens a transaction at the requested isolation level and hands the
//! connection to a [`DieselTransaction`]. The handle implements every
//! transaction-scoped writer port directly, so all writes of one attempt run
//! on the same connection.
//!
//! # Overlap enforcement
//!
//! Reservation writes lock the resource row (`SELECT ... FOR UPDATE`) before
//! checking for overlapping non-cancelled reservations, which serializes
//! writers per resource under READ COMMITTED. The partial unique index on
//! `(resource_id, start_at)` catches identical starts if the lock is ever
//! bypassed.
//!
//! # Ledger collisions
//!
//! Ledger inserts use `ON CONFLICT DO NOTHING`. A collision with a committed
//! row reports [`InsertOutcome::Conflict`]; a collision with an uncommitted
//! row blocks until that transaction finishes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use tracing::debug;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::idempotency::{
    IdempotencyCompletion, IdempotencyKey, IdempotencyRecord, IdempotencyStatus, InsertOutcome,
    NewIdempotencyEntry,
};
use crate::domain::notifications::NotificationJob;
use crate::domain::ports::{
    IdempotencyLedger, IdempotencyLedgerError, IsolationLevel, NotificationWriteError,
    NotificationWriter, ReservationWriteError, ReservationWriter, StoreTransaction,
    TransactionStore, TransactionStoreError,
};
use crate::domain::reservations::{Reservation, ReservationStatus};

use super::diesel_error_mapping::{StoreFailure, classify_diesel_error, pool_error_message};
use super::models::{
    IdempotencyRecordRow, NewIdempotencyRecordRow, NewNotificationJobRow, NewReservationRow,
};
use super::pool::DbPool;
use super::schema::{idempotency_records, notification_jobs, reservations, resources};

/// Diesel-backed [`TransactionStore`].
#[derive(Clone)]
pub struct DieselTransactionStore {
    pool: DbPool,
}

impl DieselTransactionStore {
    /// Create a store drawing connections from `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// One open PostgreSQL transaction.
///
/// Dropping the handle without committing returns a connection with an open
/// transaction to the pool, which discards it; the server then rolls the
/// work back.
pub struct DieselTransaction {
    conn: PooledConnection<'static, AsyncPgConnection>,
}

impl DieselTransaction {
    fn conn(&mut self) -> &mut AsyncPgConnection {
        &mut self.conn
    }
}

fn map_control_error(error: diesel::result::Error) -> TransactionStoreError {
    match classify_diesel_error(error) {
        StoreFailure::Connection(message) => TransactionStoreError::connection(message),
        StoreFailure::Transient(message) => TransactionStoreError::transient(message),
        StoreFailure::UniqueViolation(message) | StoreFailure::ForeignKeyViolation(message) => {
            TransactionStoreError::query(message)
        }
        StoreFailure::Query(message) => TransactionStoreError::query(message),
    }
}

fn map_ledger_error(error: diesel::result::Error) -> IdempotencyLedgerError {
    match classify_diesel_error(error) {
        StoreFailure::Connection(message) => IdempotencyLedgerError::connection(message),
        StoreFailure::Transient(message) => IdempotencyLedgerError::transient(message),
        StoreFailure::UniqueViolation(message) | StoreFailure::ForeignKeyViolation(message) => {
            IdempotencyLedgerError::query(message)
        }
        StoreFailure::Query(message) => IdempotencyLedgerError::query(message),
    }
}

fn map_reservation_error(error: diesel::result::Error) -> ReservationWriteError {
    match classify_diesel_error(error) {
        StoreFailure::Connection(message) => ReservationWriteError::connection(message),
        StoreFailure::Transient(message) => ReservationWriteError::transient(message),
        StoreFailure::UniqueViolation(message) => ReservationWriteError::slot_conflict(message),
        StoreFailure::ForeignKeyViolation(message) => {
            ReservationWriteError::missing_resource(message)
        }
        StoreFailure::Query(message) => ReservationWriteError::query(message),
    }
}

fn map_notification_error(error: diesel::result::Error) -> NotificationWriteError {
    match classify_diesel_error(error) {
        StoreFailure::Connection(message) => NotificationWriteError::connection(message),
        StoreFailure::Transient(message) => NotificationWriteError::transient(message),
        StoreFailure::UniqueViolation(message) | StoreFailure::ForeignKeyViolation(message) => {
            NotificationWriteError::query(message)
        }
        StoreFailure::Query(message) => NotificationWriteError::query(message),
    }
}

#[async_trait]
impl TransactionStore for DieselTransactionStore {
    type Tx = DieselTransaction;

    async fn begin(&self, isolation: IsolationLevel) -> Result<Self::Tx, TransactionStoreError> {
        let conn = self
            .pool
            .get_owned()
            .await
            .map_err(|err| TransactionStoreError::connection(pool_error_message(err)))?;
        let mut tx = DieselTransaction { conn };

        AnsiTransactionManager::begin_transaction(tx.conn())
            .await
            .map_err(map_control_error)?;
        // Must be the first statement of the transaction. `as_sql` only
        // yields fixed keywords.
        diesel::sql_query(format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            isolation.as_sql()
        ))
        .execute(tx.conn())
        .await
        .map_err(map_control_error)?;

        debug!(%isolation, "transaction opened");
        Ok(tx)
    }
}

#[async_trait]
impl StoreTransaction for DieselTransaction {
    async fn commit(mut self) -> Result<(), TransactionStoreError> {
        AnsiTransactionManager::commit_transaction(self.conn())
            .await
            .map_err(map_control_error)
    }

    async fn rollback(mut self) -> Result<(), TransactionStoreError> {
        AnsiTransactionManager::rollback_transaction(self.conn())
            .await
            .map_err(map_control_error)
    }
}

#[async_trait]
impl IdempotencyLedger for DieselTransaction {
    async fn try_insert(
        &mut self,
        entry: &NewIdempotencyEntry,
    ) -> Result<InsertOutcome, IdempotencyLedgerError> {
        let inserted = diesel::insert_into(idempotency_records::table)
            .values(&NewIdempotencyRecordRow::from(entry))
            .on_conflict_do_nothing()
            .execute(self.conn())
            .await
            .map_err(map_ledger_error)?;

        Ok(if inserted == 0 {
            InsertOutcome::Conflict
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn get(
        &mut self,
        key: &IdempotencyKey,
        user_id: &UserId,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyLedgerError> {
        let row: Option<IdempotencyRecordRow> = idempotency_records::table
            .filter(idempotency_records::key.eq(key.as_ref()))
            .filter(idempotency_records::user_id.eq(user_id.as_uuid()))
            .select(IdempotencyRecordRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_ledger_error)?;

        row.map(IdempotencyRecord::try_from)
            .transpose()
            .map_err(|err| IdempotencyLedgerError::corrupt(err.to_string()))
    }

    async fn mark_completed(
        &mut self,
        key: &IdempotencyKey,
        user_id: &UserId,
        completion: &IdempotencyCompletion,
    ) -> Result<(), IdempotencyLedgerError> {
        let updated = diesel::update(
            idempotency_records::table
                .filter(idempotency_records::key.eq(key.as_ref()))
                .filter(idempotency_records::user_id.eq(user_id.as_uuid()))
                .filter(idempotency_records::status.eq(IdempotencyStatus::Processing.as_str())),
        )
        .set((
            idempotency_records::status.eq(IdempotencyStatus::Completed.as_str()),
            idempotency_records::result_hash.eq(Some(completion.result_hash.as_bytes().as_slice())),
            idempotency_records::result_reservation_id.eq(Some(completion.reservation_id)),
        ))
        .execute(self.conn())
        .await
        .map_err(map_ledger_error)?;

        if updated == 0 {
            return Err(IdempotencyLedgerError::query(
                "no processing record to complete",
            ));
        }
        Ok(())
    }

    async fn reclaim_expired(
        &mut self,
        entry: &NewIdempotencyEntry,
        now: DateTime<Utc>,
    ) -> Result<bool, IdempotencyLedgerError> {
        let updated = diesel::update(
            idempotency_records::table
                .filter(idempotency_records::key.eq(entry.key.as_ref()))
                .filter(idempotency_records::user_id.eq(entry.user_id.as_uuid()))
                .filter(idempotency_records::expires_at.le(now)),
        )
        .set((
            idempotency_records::endpoint.eq(entry.endpoint.as_str()),
            idempotency_records::status.eq(IdempotencyStatus::Processing.as_str()),
            idempotency_records::request_hash.eq(entry.request_hash.as_bytes().as_slice()),
            idempotency_records::result_hash.eq(None::<Vec<u8>>),
            idempotency_records::result_reservation_id.eq(None::<Uuid>),
            idempotency_records::created_at.eq(entry.created_at),
            idempotency_records::expires_at.eq(entry.expires_at),
        ))
        .execute(self.conn())
        .await
        .map_err(map_ledger_error)?;

        Ok(updated == 1)
    }
}

#[async_trait]
impl ReservationWriter for DieselTransaction {
    async fn create(&mut self, reservation: &Reservation) -> Result<(), ReservationWriteError> {
        let resource_id = reservation.resource_id();
        let slot = reservation.slot();

        let locked: Option<Uuid> = resources::table
            .find(resource_id)
            .select(resources::id)
            .for_update()
            .first(self.conn())
            .await
            .optional()
            .map_err(map_reservation_error)?;
        if locked.is_none() {
            return Err(ReservationWriteError::missing_resource(format!(
                "resource {resource_id} does not exist"
            )));
        }

        let overlapping: Option<Uuid> = reservations::table
            .filter(reservations::resource_id.eq(resource_id))
            .filter(reservations::status.ne(ReservationStatus::Cancelled.as_str()))
            .filter(reservations::start_at.lt(slot.end()))
            .filter(reservations::end_at.gt(slot.start()))
            .select(reservations::id)
            .first(self.conn())
            .await
            .optional()
            .map_err(map_reservation_error)?;
        if let Some(existing) = overlapping {
            debug!(%resource_id, %existing, "reservation slot overlaps");
            return Err(ReservationWriteError::slot_conflict(format!(
                "overlaps reservation {existing}"
            )));
        }

        diesel::insert_into(reservations::table)
            .values(&NewReservationRow::from(reservation))
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_reservation_error)
    }
}

#[async_trait]
impl NotificationWriter for DieselTransaction {
    async fn create_job(&mut self, job: &NotificationJob) -> Result<(), NotificationWriteError> {
        diesel::insert_into(notification_jobs::table)
            .values(&NewNotificationJobRow::from(job))
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_notification_error)
    }
}
