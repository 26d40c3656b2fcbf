//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                - Health check
//! GET    /health/ready          - Readiness check (database ping)
//!
//! # Catalog
//! GET    /novels                - Novel list (?year=)
//! GET    /novels/{id}           - Novel detail
//!
//! # Cart
//! GET    /cart                  - Cart view
//! POST   /cart/add_item         - Add copies of a novel
//! PUT    /cart/update_item      - Change a line by a signed amount
//! DELETE /cart/remove_item      - Delete a line (?item_id=)
//! DELETE /cart/clear            - Delete every line
//!
//! # Auth
//! POST   /auth/register         - Create account and sign in
//! POST   /auth/login            - Sign in
//! POST   /auth/logout           - Sign out
//! GET    /auth/logout_get       - Sign out (GET alias)
//! GET    /auth/current_user     - Signed-in user profile
//! ```
//!
//! Trailing slashes are trimmed before routing, so `/cart/add_item/` also
//! matches.

pub mod auth;
pub mod cart;
pub mod health;
pub mod novels;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the catalog routes router.
pub fn novel_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(novels::index))
        .route("/{id}", get(novels::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add_item", post(cart::add_item))
        .route("/update_item", put(cart::update_item))
        .route("/remove_item", delete(cart::remove_item))
        .route("/clear", delete(cart::clear))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/logout_get", get(auth::logout))
        .route("/current_user", get(auth::current_user))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/novels", novel_routes())
        .nest("/cart", cart_routes())
        .nest("/auth", auth_routes())
}
