//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required form field was absent or empty.
    #[error("{0}")]
    MissingFields(&'static str),

    /// `password` and `confirm_password` differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Password too short.
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] novel_cart_core::EmailError),

    /// Username already registered.
    #[error("username already exists")]
    UsernameTaken,

    /// Email already registered.
    #[error("email is already in use")]
    EmailTaken,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
