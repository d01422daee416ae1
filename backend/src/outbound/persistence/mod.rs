//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain's store ports backed by PostgreSQL
//! via Diesel with async support through `diesel-async` and `bb8` pooling.
//!
//! - **Thin adapters**: implementations only translate between Diesel rows
//!   and domain types. Arbitration and validation live in the domain.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: driver errors are classified once and mapped
//!   into each port's error enum.
//!
//! # Example
//!
//! ```ignore
//! use booking_backend::outbound::persistence::{
//!     DbPool, DieselSnapshotReader, DieselTransactionStore, PoolConfig,
//! };
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/bookings")).await?;
//! let store = DieselTransactionStore::new(pool.clone());
//! let snapshots = DieselSnapshotReader::new(pool);
//! ```

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

mod diesel_error_mapping;
mod diesel_idempotency_maintenance;
mod diesel_snapshot_reader;
mod diesel_transaction_store;
mod models;
mod pool;
mod schema;

pub use diesel_idempotency_maintenance::DieselIdempotencyMaintenance;
pub use diesel_snapshot_reader::DieselSnapshotReader;
pub use diesel_transaction_store::{DieselTransaction, DieselTransactionStore};
pub use pool::{DbPool, PoolConfig, PoolError};

/// Schema migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
