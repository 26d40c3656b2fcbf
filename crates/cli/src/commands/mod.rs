//! Subcommand implementations.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Read the database URL the same way the API does.
///
/// # Errors
///
/// Returns an error if neither `NOVEL_CART_DATABASE_URL` nor `DATABASE_URL`
/// is set.
pub fn database_url() -> Result<SecretString, &'static str> {
    dotenvy::dotenv().ok();

    std::env::var("NOVEL_CART_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "NOVEL_CART_DATABASE_URL not set")
}
