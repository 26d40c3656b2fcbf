//! Domain models for the API.
//!
//! Row types live next to their repositories in `db`; these are the
//! validated shapes handed to services and serialized to clients.

pub mod cart;
pub mod novel;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem, CartOwner, CartView};
pub use novel::Novel;
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
