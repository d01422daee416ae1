//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod idempotency_ledger;
mod idempotency_maintenance;
mod idempotency_metrics;
mod notification_writer;
mod reservation_command;
mod reservation_writer;
mod snapshot_reader;
mod transaction_store;

#[cfg(test)]
pub use idempotency_ledger::MockIdempotencyLedger;
pub use idempotency_ledger::{IdempotencyLedger, IdempotencyLedgerError};
#[cfg(test)]
pub use idempotency_maintenance::MockIdempotencyMaintenance;
pub use idempotency_maintenance::{IdempotencyMaintenance, IdempotencyMaintenanceError};
#[cfg(test)]
pub use idempotency_metrics::MockIdempotencyMetrics;
pub use idempotency_metrics::{
    IdempotencyMetricLabels, IdempotencyMetrics, IdempotencyMetricsError,
    NoOpIdempotencyMetrics, calculate_age_bucket, user_scope_hash,
};
#[cfg(test)]
pub use notification_writer::MockNotificationWriter;
pub use notification_writer::{NotificationWriteError, NotificationWriter};
#[cfg(test)]
pub use reservation_command::MockReservationCommand;
pub use reservation_command::{
    CreateReservationCommand, CreateReservationResult, ReservationCommand,
};
#[cfg(test)]
pub use reservation_writer::MockReservationWriter;
pub use reservation_writer::{ReservationWriteError, ReservationWriter};
#[cfg(test)]
pub use snapshot_reader::MockSnapshotReader;
pub use snapshot_reader::{SnapshotReadError, SnapshotReader};
pub use transaction_store::{
    IsolationLevel, StoreTransaction, TransactionStore, TransactionStoreError,
};
