//! Reservation creation workflow.
//!
//! [`CreateReservationService`] implements [`ReservationCommand`]:
//! 1. Normalize and validate the request without touching the store.
//! 2. Load the resource and coupon snapshots outside the write transaction.
//! 3. Inside a coordinated transaction, arbitrate the idempotency key, then
//!    price, persist and enqueue the notification for a fresh attempt.
//! 4. After commit, read the reservation back for the response.
//!
//! The ledger's (key, user) uniqueness is the only synchronization between
//! concurrent submissions; there is no in-process lock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use scoped_futures::ScopedFutureExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::idempotency::{
    CommandEndpoint, ContentHash, IdempotencyCompletion, IdempotencyConfig, IdempotencyKey,
    NewIdempotencyEntry, canonicalize_and_hash,
};
use crate::domain::notifications::NotificationJob;
use crate::domain::ports::{
    CreateReservationCommand, CreateReservationResult, IdempotencyLedger,
    IdempotencyMetricLabels, IdempotencyMetrics, NoOpIdempotencyMetrics, NotificationWriter,
    ReservationCommand, ReservationWriter, SnapshotReader, TransactionStore,
};
use crate::domain::reservations::{
    NormalizedReservationRequest, Reservation, ReservationDraft, ReservationValidationError,
    ensure_lead_time, quote_price,
};
use crate::domain::snapshots::{CouponSnapshot, ResourceSnapshot};
use crate::domain::transaction::TransactionCoordinator;
use crate::domain::{Error, UserId};

mod arbitration;
mod mapping;

use arbitration::{Arbitration, arbitrate};
use mapping::{
    map_ledger_error, map_notification_error, map_reservation_write_error, map_snapshot_error,
    map_validation_error,
};

/// Everything an attempt needs, borrowed from the caller.
#[derive(Clone, Copy)]
struct AttemptPlan<'p> {
    key: &'p IdempotencyKey,
    user_id: &'p UserId,
    request: &'p NormalizedReservationRequest,
    resource: &'p ResourceSnapshot,
    coupon: Option<&'p CouponSnapshot>,
    request_hash: ContentHash,
}

/// What a committed attempt decided.
enum AttemptOutcome {
    Created { reservation_id: Uuid },
    Replayed {
        reservation_id: Uuid,
        first_seen: DateTime<Utc>,
    },
    DuplicatePayload { first_seen: DateTime<Utc> },
    InProgress,
}

/// Idempotency outcome for metrics recording.
enum LedgerOutcome {
    Miss,
    Hit(DateTime<Utc>),
    Conflict(DateTime<Utc>),
}

/// Reservation creation service.
///
/// The `M` type parameter allows injection of a metrics recorder; use
/// [`CreateReservationService::with_noop_metrics`] when metrics are not
/// needed.
pub struct CreateReservationService<S, R, M = NoOpIdempotencyMetrics> {
    coordinator: TransactionCoordinator<S>,
    snapshots: Arc<R>,
    clock: Arc<dyn Clock>,
    idempotency: IdempotencyConfig,
    metrics: Arc<M>,
}

impl<S, R> CreateReservationService<S, R, NoOpIdempotencyMetrics> {
    /// Create a service that records no metrics.
    pub fn with_noop_metrics(
        coordinator: TransactionCoordinator<S>,
        snapshots: Arc<R>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(coordinator, snapshots, clock, Arc::new(NoOpIdempotencyMetrics))
    }
}

impl<S, R, M> CreateReservationService<S, R, M> {
    /// Create a service with an explicit metrics recorder.
    ///
    /// ```rust,ignore
    /// # use std::sync::Arc;
    /// # use booking_backend::domain::{CreateReservationService, TransactionConfig, TransactionCoordinator};
    /// # use booking_backend::domain::ports::NoOpIdempotencyMetrics;
    /// # use booking_backend::test_support::InMemoryBookingStore;
    /// # use mockable::DefaultClock;
    /// let store = Arc::new(InMemoryBookingStore::default());
    /// let service = CreateReservationService::new(
    ///     TransactionCoordinator::new(store.clone(), TransactionConfig::from_env()),
    ///     store,
    ///     Arc::new(DefaultClock),
    ///     Arc::new(NoOpIdempotencyMetrics),
    /// );
    /// # let _ = service;
    /// ```
    pub fn new(
        coordinator: TransactionCoordinator<S>,
        snapshots: Arc<R>,
        clock: Arc<dyn Clock>,
        metrics: Arc<M>,
    ) -> Self {
        Self {
            coordinator,
            snapshots,
            clock,
            idempotency: IdempotencyConfig::default(),
            metrics,
        }
    }

    /// Replace the ledger TTL configuration.
    #[must_use]
    pub fn with_idempotency_config(mut self, idempotency: IdempotencyConfig) -> Self {
        self.idempotency = idempotency;
        self
    }
}

impl<S, R, M> CreateReservationService<S, R, M>
where
    S: TransactionStore,
    R: SnapshotReader,
    M: IdempotencyMetrics,
{
    async fn load_resource(&self, resource_id: Uuid) -> Result<ResourceSnapshot, Error> {
        self.snapshots
            .resource_by_id(resource_id)
            .await
            .map_err(map_snapshot_error)?
            .ok_or_else(|| Error::not_found("resource not found"))
    }

    async fn load_coupon(
        &self,
        request: &NormalizedReservationRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<CouponSnapshot>, Error> {
        let Some(code) = request.coupon_code() else {
            return Ok(None);
        };
        let coupon = self
            .snapshots
            .coupon_by_code(code)
            .await
            .map_err(map_snapshot_error)?
            .ok_or_else(|| Error::not_found("coupon not found"))?;
        if !coupon.is_valid_at(now) {
            return Err(map_validation_error(
                ReservationValidationError::CouponNotApplicable,
            ));
        }
        Ok(Some(coupon))
    }

    async fn run_attempt(&self, tx: &mut S::Tx, plan: AttemptPlan<'_>) -> Result<AttemptOutcome, Error> {
        let now = self.clock.utc();
        let entry = NewIdempotencyEntry {
            key: plan.key.clone(),
            user_id: plan.user_id.clone(),
            endpoint: CommandEndpoint::CreateReservation,
            request_hash: plan.request_hash,
            created_at: now,
            expires_at: self.idempotency.expires_at(now),
        };

        match arbitrate(&mut *tx, &entry, now).await? {
            Arbitration::Fresh => {}
            Arbitration::Replay {
                reservation_id,
                first_seen,
            } => {
                return Ok(AttemptOutcome::Replayed {
                    reservation_id,
                    first_seen,
                });
            }
            Arbitration::DuplicatePayload { first_seen } => {
                return Ok(AttemptOutcome::DuplicatePayload { first_seen });
            }
            Arbitration::InProgress => return Ok(AttemptOutcome::InProgress),
        }

        let reservation = build_reservation(plan, now)?;
        tx.create(&reservation)
            .await
            .map_err(map_reservation_write_error)?;

        let job = NotificationJob::reservation_created(&reservation, now).map_err(|err| {
            Error::internal(format!("failed to encode notification payload: {err}"))
        })?;
        tx.create_job(&job).await.map_err(map_notification_error)?;

        let completion = IdempotencyCompletion {
            result_hash: result_hash(&reservation)?,
            reservation_id: reservation.id(),
        };
        tx.mark_completed(plan.key, plan.user_id, &completion)
            .await
            .map_err(map_ledger_error)?;

        Ok(AttemptOutcome::Created {
            reservation_id: reservation.id(),
        })
    }

    async fn respond(
        &self,
        reservation_id: Uuid,
        is_replayed: bool,
    ) -> Result<CreateReservationResult, Error> {
        let reservation = self
            .snapshots
            .reservation_view_by_id(reservation_id)
            .await
            .map_err(map_snapshot_error)?
            .ok_or_else(|| {
                Error::internal(format!(
                    "reservation {reservation_id} missing after commit"
                ))
            })?;
        Ok(CreateReservationResult {
            reservation_id,
            is_replayed,
            reservation,
        })
    }

    /// Record an idempotency outcome metric.
    ///
    /// Errors are logged and otherwise ignored so metrics never affect the
    /// command result.
    async fn record_outcome(&self, outcome: LedgerOutcome, user_id: &UserId) {
        let now = self.clock.utc();
        let result = match outcome {
            LedgerOutcome::Miss => {
                self.metrics
                    .record_miss(&IdempotencyMetricLabels::miss(user_id))
                    .await
            }
            LedgerOutcome::Hit(first_seen) => {
                self.metrics
                    .record_hit(&IdempotencyMetricLabels::existing(user_id, first_seen, now))
                    .await
            }
            LedgerOutcome::Conflict(first_seen) => {
                self.metrics
                    .record_conflict(&IdempotencyMetricLabels::existing(user_id, first_seen, now))
                    .await
            }
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to record idempotency metric");
        }
    }
}

fn build_reservation(plan: AttemptPlan<'_>, now: DateTime<Utc>) -> Result<Reservation, Error> {
    let slot = plan.request.slot();
    ensure_lead_time(plan.resource, slot, now).map_err(map_validation_error)?;
    let total_price_cents =
        quote_price(plan.resource, slot, plan.coupon).map_err(map_validation_error)?;

    Reservation::new(ReservationDraft {
        id: Uuid::new_v4(),
        resource_id: plan.resource.id,
        user_id: plan.user_id.clone(),
        slot,
        note: plan.request.note().map(str::to_owned),
        coupon_id: plan.coupon.map(|coupon| coupon.id),
        total_price_cents,
    })
    .map_err(map_validation_error)
}

/// Hash of the result recorded against the ledger entry.
fn result_hash(reservation: &Reservation) -> Result<ContentHash, Error> {
    let payload = json!({
        "reservationId": reservation.id(),
        "status": reservation.status().as_str(),
        "totalPriceCents": reservation.total_price_cents(),
    });
    canonicalize_and_hash(&payload)
        .map_err(|err| Error::internal(format!("failed to hash reservation result: {err}")))
}

#[async_trait]
impl<S, R, M> ReservationCommand for CreateReservationService<S, R, M>
where
    S: TransactionStore,
    R: SnapshotReader,
    M: IdempotencyMetrics,
{
    async fn create_reservation(
        &self,
        cancel: &CancellationToken,
        command: CreateReservationCommand,
    ) -> Result<CreateReservationResult, Error> {
        let CreateReservationCommand {
            request,
            user_id,
            idempotency_key,
        } = command;

        let normalized = NormalizedReservationRequest::parse(&request).map_err(map_validation_error)?;
        let resource = self.load_resource(normalized.resource_id()).await?;
        let coupon = self.load_coupon(&normalized, self.clock.utc()).await?;
        let request_hash = normalized
            .fingerprint()
            .map_err(|err| Error::internal(format!("failed to fingerprint request: {err}")))?;

        let plan = AttemptPlan {
            key: &idempotency_key,
            user_id: &user_id,
            request: &normalized,
            resource: &resource,
            coupon: coupon.as_ref(),
            request_hash,
        };

        let outcome = self
            .coordinator
            .within(cancel, move |tx| {
                async move { self.run_attempt(tx, plan).await }.scope_boxed()
            })
            .await?;

        match outcome {
            AttemptOutcome::Created { reservation_id } => {
                info!(
                    %reservation_id,
                    resource_id = %resource.id,
                    replayed = false,
                    "reservation created"
                );
                self.record_outcome(LedgerOutcome::Miss, &user_id).await;
                self.respond(reservation_id, false).await
            }
            AttemptOutcome::Replayed {
                reservation_id,
                first_seen,
            } => {
                info!(
                    %reservation_id,
                    resource_id = %resource.id,
                    replayed = true,
                    "reservation replayed"
                );
                self.record_outcome(LedgerOutcome::Hit(first_seen), &user_id)
                    .await;
                self.respond(reservation_id, true).await
            }
            AttemptOutcome::DuplicatePayload { first_seen } => {
                self.record_outcome(LedgerOutcome::Conflict(first_seen), &user_id)
                    .await;
                Err(Error::duplicate_request(
                    "idempotency key already used with a different request",
                ))
            }
            AttemptOutcome::InProgress => Err(Error::in_progress(
                "a request with this idempotency key is still being processed",
            )),
        }
    }
}
