//! Purge expired idempotency ledger records.
//!
//! Expired records are already ignored by the reservation workflow; this
//! sweep only reclaims storage. Safe to run concurrently with live traffic.
//!
//! # Examples
//! ```sh
//! DATABASE_URL=postgres://localhost/bookings \
//!     cargo run --manifest-path backend/Cargo.toml --bin idempotency-sweep -- --grace-minutes 60
//! ```
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::time::Duration;

use booking_backend::domain::ports::IdempotencyMaintenance;
use booking_backend::outbound::persistence::{DbPool, DieselIdempotencyMaintenance, PoolConfig};
use chrono::{DateTime, TimeDelta, Utc};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use mockable::{Clock, DefaultClock};
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `idempotency-sweep` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "idempotency-sweep",
    about = "Delete idempotency ledger records past their expiry",
    version
)]
struct CliArgs {
    /// Database connection URL.
    #[arg(long = "database-url", env = "DATABASE_URL", value_name = "url")]
    database_url: String,
    /// Keep records for this many minutes past their expiry.
    #[arg(long = "grace-minutes", value_name = "minutes", default_value_t = 0)]
    grace_minutes: u32,
    /// Connection checkout timeout in seconds.
    #[arg(long = "connect-timeout", value_name = "seconds", default_value_t = 10)]
    connect_timeout_secs: u64,
}

impl CliArgs {
    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - TimeDelta::minutes(i64::from(self.grace_minutes))
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(sweep(args))
}

async fn sweep(args: CliArgs) -> Result<()> {
    let config = PoolConfig::new(&args.database_url)
        .with_max_size(1)
        .with_min_idle(None)
        .with_connection_timeout(Duration::from_secs(args.connect_timeout_secs));
    let pool = DbPool::new(config)
        .await
        .wrap_err("create database pool")?;
    let maintenance = DieselIdempotencyMaintenance::new(pool);

    let cutoff = args.cutoff(DefaultClock.utc());
    let deleted = maintenance
        .purge_expired(cutoff)
        .await
        .wrap_err("purge expired idempotency records")?;

    info!(deleted, %cutoff, "idempotency sweep finished");
    Ok(())
}
