//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! nc-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `NOVEL_CART_DATABASE_URL` - SQLite connection string (falls back to
//!   `DATABASE_URL`), e.g. `sqlite://novel_cart.db`
//!
//! Migrations live in `crates/api/migrations/` and are embedded in the API
//! crate. The session table is created by the API at startup.

use tracing::info;

use novel_cart_api::db;

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("{0}")]
    Config(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the database cannot be
/// opened, or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = super::database_url().map_err(MigrationError::Config)?;

    info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running migrations...");
    db::run_migrations(&pool).await?;

    info!("Migrations complete!");
    Ok(())
}
