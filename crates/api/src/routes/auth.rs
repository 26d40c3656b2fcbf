//! Authentication route handlers.
//!
//! Handles registration, login, logout, and the current-user lookup.
//! Signing in rotates the session ID and folds any anonymous cart the
//! session was holding into the user's cart.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use novel_cart_core::UserId;

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::cart::{anonymous_cart, forget_anonymous_cart};
use crate::middleware::{OptionalAuth, RequireAuth, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{LoginForm, RegisterForm};
use crate::services::{AuthService, CartService};
use crate::state::AppState;

// =============================================================================
// Response Types
// =============================================================================

/// Response to a successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub user_id: UserId,
}

/// Response to a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: User,
}

/// Response to a logout.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: &'static str,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account and sign it in.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    form: std::result::Result<Json<RegisterForm>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let Json(form) = form?;

    let user = AuthService::new(state.pool()).register(form).await?;
    sign_in(&state, &session, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "registration successful",
            user_id: user.id,
        }),
    ))
}

/// Sign in with username and password.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    form: std::result::Result<Json<LoginForm>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(form) = form?;

    let user = AuthService::new(state.pool()).login(form).await?;
    sign_in(&state, &session, &user).await?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse {
        success: true,
        message: "login successful",
        user,
    }))
}

/// Sign out, emptying the user's cart and destroying the session.
#[instrument(skip(state, session, user))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<LogoutResponse>> {
    if let Some(user) = user {
        let removed = CartService::new(state.pool(), state.cart_policy())
            .clear_for_user(user.id)
            .await?;
        tracing::info!(user_id = %user.id, removed, "user logged out");
    }

    session.flush().await?;
    clear_sentry_user();

    Ok(Json(LogoutResponse {
        success: true,
        message: "logout successful",
    }))
}

/// Profile of the signed-in user.
#[instrument(skip(state, current))]
pub async fn current_user(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("not logged in".to_string()))
}

// =============================================================================
// Helpers
// =============================================================================

/// Bind the session to `user`.
///
/// The session ID is cycled to prevent fixation. An anonymous cart held by
/// the session is merged into the user's cart and unbound.
async fn sign_in(state: &AppState, session: &Session, user: &User) -> Result<()> {
    let anonymous = anonymous_cart(session).await?;

    session.cycle_id().await?;

    if let Some((session_key, last_activity)) = anonymous {
        CartService::new(state.pool(), state.cart_policy())
            .merge_into_user(&session_key, last_activity, user.id, Utc::now())
            .await?;
        forget_anonymous_cart(session).await?;
    }

    set_current_user(
        session,
        &CurrentUser {
            id: user.id,
            username: user.username.clone(),
        },
    )
    .await?;
    set_sentry_user(&user.id, &user.username);

    Ok(())
}
