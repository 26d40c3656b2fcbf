//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with SQLite store)
//!
//! The cart and auth extractors read the session installed by layer 4.

pub mod auth;
pub mod cart;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, set_current_user};
pub use cart::{CurrentCart, resolve_cart};
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, create_session_store};
