//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use novel_cart_core::{Email, UserId};

/// A site account.
///
/// Serializes to the public profile shape returned by login and
/// `current_user`; the password hash never leaves the repository.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// When the account was created.
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}
