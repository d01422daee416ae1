//! PostgreSQL-backed [`SnapshotReader`].
//!
//! Each query borrows a pooled connection outside any write transaction and
//! sees the latest committed state.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::idempotency::{IdempotencyKey, IdempotencyRecord};
use crate::domain::ports::{SnapshotReadError, SnapshotReader};
use crate::domain::snapshots::{
    CouponSnapshot, ReservationSnapshot, ReservationView, ResourceSnapshot,
};

use super::diesel_error_mapping::{StoreFailure, classify_diesel_error, pool_error_message};
use super::models::{CouponRow, IdempotencyRecordRow, InvalidRow, ReservationRow, ResourceRow};
use super::pool::DbPool;
use super::schema::{coupons, idempotency_records, reservations, resources};

diesel::define_sql_function!(fn lower(value: Text) -> Text);

/// Diesel-backed snapshot reader.
#[derive(Clone)]
pub struct DieselSnapshotReader {
    pool: DbPool,
}

impl DieselSnapshotReader {
    /// Create a reader drawing connections from `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> SnapshotReadError {
    match classify_diesel_error(error) {
        StoreFailure::Connection(message) => SnapshotReadError::connection(message),
        StoreFailure::Transient(message)
        | StoreFailure::UniqueViolation(message)
        | StoreFailure::ForeignKeyViolation(message) => SnapshotReadError::query(message),
        StoreFailure::Query(message) => SnapshotReadError::query(message),
    }
}

fn convert<R, T>(row: Option<R>) -> Result<Option<T>, SnapshotReadError>
where
    T: TryFrom<R, Error = InvalidRow>,
{
    row.map(T::try_from)
        .transpose()
        .map_err(|err| SnapshotReadError::corrupt(err.to_string()))
}

impl DieselSnapshotReader {
    async fn reservation_row(&self, id: Uuid) -> Result<Option<ReservationRow>, SnapshotReadError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| SnapshotReadError::connection(pool_error_message(err)))?;

        reservations::table
            .find(id)
            .select(ReservationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)
    }
}

#[async_trait]
impl SnapshotReader for DieselSnapshotReader {
    async fn resource_by_id(&self, id: Uuid) -> Result<Option<ResourceSnapshot>, SnapshotReadError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| SnapshotReadError::connection(pool_error_message(err)))?;

        let row: Option<ResourceRow> = resources::table
            .find(id)
            .select(ResourceRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        convert(row)
    }

    async fn coupon_by_code(&self, code: &str) -> Result<Option<CouponSnapshot>, SnapshotReadError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| SnapshotReadError::connection(pool_error_message(err)))?;

        let row: Option<CouponRow> = coupons::table
            .filter(lower(coupons::code).eq(code.to_lowercase()))
            .select(CouponRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        convert(row)
    }

    async fn reservation_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<ReservationSnapshot>, SnapshotReadError> {
        convert(self.reservation_row(id).await?)
    }

    async fn reservation_view_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<ReservationView>, SnapshotReadError> {
        convert(self.reservation_row(id).await?)
    }

    async fn idempotency_by_key(
        &self,
        key: &IdempotencyKey,
        user_id: &UserId,
    ) -> Result<Option<IdempotencyRecord>, SnapshotReadError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| SnapshotReadError::connection(pool_error_message(err)))?;

        let row: Option<IdempotencyRecordRow> = idempotency_records::table
            .filter(idempotency_records::key.eq(key.as_ref()))
            .filter(idempotency_records::user_id.eq(user_id.as_uuid()))
            .select(IdempotencyRecordRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        convert(row)
    }
}
