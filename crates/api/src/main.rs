//! Novel Cart API server.
//!
//! Serves the catalog, cart, and account endpoints as JSON over HTTP
//! (port 8000 by default). Sessions and data live in one SQLite database;
//! apply the schema first with `nc-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::borrow::Cow;

use axum::{ServiceExt, extract::Request};
use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use novel_cart_api::config::ApiConfig;
use novel_cart_api::state::AppState;
use novel_cart_api::{db, middleware};

const DEFAULT_LOG_FILTER: &str = "novel_cart_api=info,tower_http=debug";

#[tokio::main]
async fn main() {
    let config = ApiConfig::from_env().expect("invalid configuration");

    // Sentry has to exist before the subscriber that forwards to it.
    let _sentry = sentry_client(&config);
    init_tracing();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("cannot open database");
    let session_store = middleware::create_session_store(&pool)
        .await
        .expect("cannot prepare session table");

    tracing::info!(
        idle_timeout_secs = config.cart.idle_timeout.num_seconds(),
        persist_after_idle = config.cart.persist_after_idle,
        "anonymous cart policy"
    );

    let addr = config.socket_addr();
    let app = novel_cart_api::app(AppState::new(config, pool), session_store);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("cannot bind listen address");
    tracing::info!(%addr, "novel-cart-api listening");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server stopped unexpectedly");
}

/// Start the Sentry client when a DSN is configured. The guard flushes
/// pending events on drop.
fn sentry_client(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;

    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: config.sentry_environment.clone().map(Cow::Owned),
        attach_stacktrace: true,
        ..Default::default()
    };

    Some(sentry::init((dsn, options)))
}

/// `RUST_LOG`-driven fmt output plus Sentry forwarding.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_filter))
        .init();
}

/// Errors and warnings become Sentry events; info and debug become
/// breadcrumbs.
fn sentry_filter(metadata: &tracing::Metadata<'_>) -> EventFilter {
    match *metadata.level() {
        Level::ERROR | Level::WARN => EventFilter::Event,
        Level::INFO | Level::DEBUG => EventFilter::Breadcrumb,
        Level::TRACE => EventFilter::Ignore,
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }

    tracing::info!("shutting down");
}
