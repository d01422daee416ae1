//! Helper binary invoked by `pg_embedded_setup_unpriv` when the Diesel
//! integration tests run as root.
//!
//! Usage: `pg-worker <setup|start|stop> <payload.json>`. The payload is a
//! [`pg_embedded_setup_unpriv::worker::WorkerPayload`] describing the cluster
//! settings and the environment to apply before acting.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Report, Result, WrapErr};
use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
use postgresql_embedded::PostgreSQL;
use tokio::runtime::Builder;

/// Cluster lifecycle step to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    Setup,
    Start,
    Stop,
}

#[derive(Debug, Parser)]
#[command(name = "pg-worker", about = "Run one embedded PostgreSQL lifecycle step")]
struct CliArgs {
    #[arg(value_enum)]
    operation: Operation,
    /// Path to the JSON worker payload.
    config_path: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    let payload = load_payload(&args.config_path)?;
    execute(args.operation, payload)
}

fn load_payload(path: &Path) -> Result<WorkerPayload> {
    let bytes = fs::read(path).wrap_err_with(|| format!("read worker config at {path:?}"))?;
    serde_json::from_slice(&bytes).wrap_err_with(|| format!("parse worker config at {path:?}"))
}

fn execute(operation: Operation, payload: WorkerPayload) -> Result<()> {
    let settings = payload
        .settings
        .into_settings()
        .map_err(|err| Report::new(err).wrap_err("rebuild postgres settings"))?;
    apply_environment(payload.environment);

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("build pg-worker runtime")?;

    let mut postgres = PostgreSQL::new(settings);
    runtime
        .block_on(async move {
            match operation {
                Operation::Setup => postgres.setup().await,
                Operation::Start => postgres.start().await,
                Operation::Stop => postgres.stop().await,
            }
        })
        .wrap_err_with(|| format!("postgresql_embedded {operation:?} failed"))
}

fn apply_environment(environment: Vec<(String, Option<PlainSecret>)>) {
    for (key, value) in environment {
        // SAFETY: runs before the runtime spawns any thread.
        match value {
            Some(val) => unsafe { env::set_var(&key, val.expose()) },
            None => unsafe { env::remove_var(&key) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("setup", Operation::Setup)]
    #[case("start", Operation::Start)]
    #[case("stop", Operation::Stop)]
    fn operations_parse(#[case] raw: &str, #[case] expected: Operation) {
        let args = CliArgs::try_parse_from(["pg-worker", raw, "/tmp/config.json"])
            .expect("valid arguments");
        assert_eq!(args.operation, expected);
    }

    #[rstest]
    fn unknown_operation_is_rejected() {
        assert!(CliArgs::try_parse_from(["pg-worker", "noop", "/tmp/config.json"]).is_err());
    }

    #[rstest]
    fn extra_argument_is_rejected() {
        let result =
            CliArgs::try_parse_from(["pg-worker", "setup", "/tmp/config.json", "unexpected"]);
        assert!(result.is_err());
    }

    #[rstest]
    fn missing_payload_reports_its_path() {
        let err = load_payload(Path::new("/nonexistent/worker.json")).expect_err("missing file");
        assert!(format!("{err:?}").contains("/nonexistent/worker.json"));
    }
}
