//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Username/password registration and login
//! - `cart` - Cart resolution, idle expiry, line mutation, sign-in merge

pub mod auth;
pub mod cart;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartRequester, CartService};
