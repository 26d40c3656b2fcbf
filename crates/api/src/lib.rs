//! Novel Cart API library.
//!
//! This crate provides the catalog, cart, and account API as a library,
//! allowing it to be tested and reused. [`app`] assembles the full service
//! exactly as the binary serves it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request, middleware::from_fn};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Build the application service over a session store.
///
/// Trailing slashes are trimmed before routing, so the returned service
/// wraps the router rather than being a `Router` itself. Serve it with
/// `ServiceExt::<Request>::into_make_service`.
pub fn app<S>(state: AppState, session_store: S) -> NormalizePath<Router>
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config().secure_cookies());

    let router = routes::routes()
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
