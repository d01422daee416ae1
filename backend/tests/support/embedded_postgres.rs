//! Database provisioning for embedded PostgreSQL suites.
//!
//! Each test gets a fresh database on the cluster, created through `postgres`
//! so Diesel transaction handling cannot interfere with `CREATE DATABASE`,
//! then migrated with the crate's embedded Diesel migrations.

use booking_backend::outbound::persistence::MIGRATIONS;
use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::MigrationHarness;
use pg_embedded_setup_unpriv::TestCluster;
use postgres::{Client, NoTls};
use uuid::Uuid;

use super::format_postgres_error;

/// Create a uniquely named, fully migrated database and return its URL.
pub fn provision_database(cluster: &TestCluster) -> Result<String, String> {
    let connection = cluster.connection();
    let admin_url = connection.database_url("postgres");
    let name = format!("booking_test_{}", Uuid::new_v4().simple());

    let mut admin = Client::connect(&admin_url, NoTls).map_err(|err| format_postgres_error(&err))?;
    admin
        .batch_execute(&format!("CREATE DATABASE \"{name}\""))
        .map_err(|err| format!("create database: {}", format_postgres_error(&err)))?;

    let url = connection.database_url(&name);
    migrate_schema(&url)?;
    Ok(url)
}

/// Run all pending Diesel migrations against `url`.
pub fn migrate_schema(url: &str) -> Result<(), String> {
    let mut conn = PgConnection::establish(url).map_err(|err| format!("{err:?}"))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| format!("migration: {err:?}"))?;
    Ok(())
}

/// Execute a batch of seed statements against `url`.
pub fn seed_sql(url: &str, sql: &str) -> Result<(), String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    client
        .batch_execute(sql)
        .map_err(|err| format_postgres_error(&err))
}
