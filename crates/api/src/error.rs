//! HTTP error type.
//!
//! Handlers return [`Result`]; every failure renders as `{"error": "<message>"}`
//! with a status picked from the error kind. Server-side failures are logged
//! and reported to Sentry on the way out.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use novel_cart_core::QuantityError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// A repository query failed.
    #[error("database: {0}")]
    Database(#[from] RepositoryError),

    /// Registration or login was refused.
    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    #[error("cart: {0}")]
    Cart(#[from] CartError),

    /// The session store could not be read or written.
    #[error("session: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("not found: {0}")]
    NotFound(String),

    /// Nobody is signed in, or the credentials were wrong.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Missing or malformed client input.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::MissingFields(_)
                | AuthError::PasswordMismatch
                | AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::UsernameTaken
                | AuthError::EmailTaken => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Cart(err) => match err {
                CartError::NovelNotFound | CartError::ItemNotFound | CartError::CartNotFound => {
                    StatusCode::NOT_FOUND
                }
                CartError::Quantity(_) => StatusCode::BAD_REQUEST,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message for the `error` field of the response body.
    fn client_message(&self) -> String {
        match self {
            Self::Auth(err) => err.to_string(),
            Self::Cart(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Database(err) => err.to_string(),
            Self::Session(err) => err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "request failed");
        }

        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

impl From<QuantityError> for AppError {
    fn from(err: QuantityError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Handler result.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after a successful login.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Forget the Sentry user after logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Record a cart or account action as a Sentry breadcrumb.
///
/// `data` pairs are attached as string values.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added novel", Some(&[("novel_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let data = data
        .unwrap_or_default()
        .iter()
        .map(|(key, value)| ((*key).to_string(), json!(value)))
        .collect();

    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        data,
        ..Default::default()
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_display_is_prefixed_by_kind() {
        assert_eq!(
            AppError::NotFound("novel".into()).to_string(),
            "not found: novel"
        );
        assert_eq!(
            AppError::from(AuthError::UsernameTaken).to_string(),
            "auth: username already exists"
        );
    }

    #[test]
    fn test_status_by_kind() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AuthError::InvalidCredentials.into(), StatusCode::UNAUTHORIZED),
            (AuthError::UsernameTaken.into(), StatusCode::BAD_REQUEST),
            (AuthError::PasswordHash.into(), StatusCode::INTERNAL_SERVER_ERROR),
            (CartError::ItemNotFound.into(), StatusCode::NOT_FOUND),
            (
                CartError::Quantity(QuantityError::OutOfRange).into(),
                StatusCode::BAD_REQUEST,
            ),
            (QuantityError::ZeroDelta.into(), StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) = body_json(AppError::BadRequest("novel_id is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "novel_id is required" }));

        let (_, body) = body_json(CartError::NovelNotFound.into()).await;
        assert_eq!(body, json!({ "error": "novel does not exist" }));
    }

    #[tokio::test]
    async fn test_server_errors_echo_message() {
        let (status, body) = body_json(AppError::Internal("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "disk on fire");
    }
}
