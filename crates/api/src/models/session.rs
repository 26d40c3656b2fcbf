//! Session-related types.
//!
//! Types stored in the session for authentication and anonymous cart state.

use serde::{Deserialize, Serialize};

use novel_cart_core::UserId;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's login name.
    pub username: String,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "auth:user";

    /// Key for the random identifier binding an anonymous session to a cart.
    pub const CART_SESSION_KEY: &str = "cart:session_key";

    /// Key for the last time the anonymous cart was touched (RFC 3339).
    pub const LAST_CART_ACTIVITY: &str = "cart:last_activity";
}
