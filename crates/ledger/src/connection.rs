use crate::error::LedgerError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Establishes a connection pool to the SQLite ledger database.
///
/// The URL comes from the application configuration and is passed in
/// explicitly; there is no implicit global handle. The database file is
/// created on first use.
pub async fn connect(database_url: &str) -> Result<SqlitePool, LedgerError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations.
///
/// Run once at startup, before the store is opened, so the schema is always
/// up to date for the process lifetime.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), LedgerError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
