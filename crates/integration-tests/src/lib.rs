//! Integration tests for Novel Cart.
//!
//! The full application service is built in-process over an in-memory
//! SQLite database and an in-memory session store, then driven request by
//! request with `tower::ServiceExt::oneshot`. [`TestApp`] plays the part of
//! a browser: it keeps the session cookie and sends it back.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p novel-cart-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::str::FromStr;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;
use tower_sessions::MemoryStore;

use novel_cart_api::config::{ApiConfig, CartPolicy};
use novel_cart_api::db::{self, NovelRepository};
use novel_cart_api::middleware::session::SESSION_COOKIE_NAME;
use novel_cart_api::models::Novel;
use novel_cart_api::models::novel::NewNovel;
use novel_cart_api::state::AppState;

/// A response with its body decoded.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Raw body text.
    pub text: String,
    /// Body parsed as JSON, or `Value::Null` if it is not JSON.
    pub json: Value,
}

impl TestResponse {
    /// The `error` message of an error body.
    #[must_use]
    pub fn error(&self) -> &str {
        self.json["error"].as_str().unwrap_or_default()
    }
}

/// The application plus one client's cookie jar.
pub struct TestApp {
    service: NormalizePath<Router>,
    pool: SqlitePool,
    cookie: Option<String>,
}

impl TestApp {
    /// Fresh application with the default cart policy.
    pub async fn new() -> Self {
        Self::with_policy(CartPolicy::default()).await
    }

    /// Fresh application with a custom anonymous cart policy.
    pub async fn with_policy(cart: CartPolicy) -> Self {
        let pool = memory_pool().await;

        let config = ApiConfig {
            database_url: SecretString::from("sqlite::memory:".to_string()),
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            base_url: "http://localhost:8000".to_string(),
            cart,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let state = AppState::new(config, pool.clone());
        let service = novel_cart_api::app(state, MemoryStore::default());

        Self {
            service,
            pool,
            cookie: None,
        }
    }

    /// The database behind the application.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Drop the session cookie, as a new browser would.
    pub fn forget_cookie(&mut self) {
        self.cookie = None;
    }

    /// Whether the server has handed this client a session cookie.
    #[must_use]
    pub const fn has_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    /// Insert a novel directly into the catalog.
    pub async fn seed_novel(&self, name: &str, rank: i64, price: &str, year: &str) -> Novel {
        NovelRepository::new(&self.pool)
            .create(&NewNovel {
                name: name.to_string(),
                author: format!("{name} author"),
                publisher: format!("{name} publisher"),
                rank,
                price: price.parse().unwrap(),
                year: year.to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    /// Register an account (which also signs it in) and return its ID.
    pub async fn register(&mut self, username: &str, password: &str) -> i64 {
        let response = self
            .post(
                "/auth/register",
                &serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": password,
                    "confirm_password": password,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.json["user_id"].as_i64().unwrap()
    }

    /// Send one request, replaying and then updating the session cookie.
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<&Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.service.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        self.store_cookie(&headers);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let json = serde_json::from_str(&text).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            text,
            json,
        }
    }

    fn store_cookie(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            let pair = value.split(';').next().unwrap_or_default().trim();
            let Some((name, cookie_value)) = pair.split_once('=') else {
                continue;
            };
            if name != SESSION_COOKIE_NAME {
                continue;
            }
            self.cookie = if cookie_value.is_empty() {
                None
            } else {
                Some(pair.to_string())
            };
        }
    }
}

/// In-memory database with migrations applied.
///
/// One connection that never expires, so every query sees the same database.
async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}
