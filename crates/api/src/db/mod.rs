//! Database operations for the Novel Cart SQLite store.
//!
//! ## Tables
//!
//! - `users` - Site accounts (username, email, argon2 hash)
//! - `novels` - Catalog, ordered by `rank`
//! - `carts` - One row per user or per anonymous session key
//! - `cart_items` - Lines, unique per `(cart_id, novel_id)`
//! - `tower_sessions` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p novel-cart-cli -- migrate
//! ```

pub mod carts;
pub mod novels;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;

pub use carts::CartRepository;
pub use novels::NovelRepository;
pub use users::UserRepository;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A value failed a range `CHECK` (e.g., a line quantity past its limit).
    #[error("out of range: {0}")]
    OutOfRange(String),
}

/// Create a SQLite connection pool with sensible defaults.
///
/// The database file is created if it does not exist. Foreign keys are
/// enforced so cart deletes cascade to their items.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Apply all pending schema migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
fn conflict_or(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(err)
}

/// Map a `CHECK` constraint violation to `RepositoryError::OutOfRange`.
fn out_of_range_or(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_check_violation()
    {
        return RepositoryError::OutOfRange(what.to_owned());
    }
    RepositoryError::Database(err)
}

/// In-memory database with migrations applied, for tests.
///
/// Uses a single connection that never expires so every query sees the
/// same memory database.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid memory url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("memory database");
    run_migrations(&pool).await.expect("migrations apply");
    pool
}
