//! Cart extractor.
//!
//! Resolves the caller's cart from the session: the signed-in user's cart,
//! or the one bound to a random key kept in the anonymous session. Anonymous
//! sessions also carry the time of their last cart access, which drives
//! idle expiry.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Utc};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::current_user;
use crate::models::{Cart, session_keys};
use crate::services::{CartRequester, CartService};
use crate::state::AppState;

/// The caller's cart, resolved (and created if needed) for this request.
///
/// # Example
///
/// ```rust,ignore
/// async fn show(State(state): State<AppState>, CurrentCart(cart): CurrentCart) -> Result<Json<CartView>> {
///     Ok(Json(CartService::new(state.pool(), state.cart_policy()).view(&cart).await?))
/// }
/// ```
pub struct CurrentCart(pub Cart);

impl FromRequestParts<AppState> for CurrentCart {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer is not installed".to_string()))?;

        Ok(Self(resolve_cart(state, session).await?))
    }
}

/// Resolve (and create if needed) the session's cart.
///
/// Handlers that validate their input first call this directly instead of
/// taking [`CurrentCart`], so a rejected request neither creates a cart nor
/// counts as cart activity.
///
/// # Errors
///
/// Returns an error if the session store or the database fails.
pub async fn resolve_cart(state: &AppState, session: &Session) -> Result<Cart, AppError> {
    let now = Utc::now();
    let requester = requester(session).await?;

    let cart = CartService::new(state.pool(), state.cart_policy())
        .resolve(&requester, now)
        .await?;

    if matches!(requester, CartRequester::Anonymous { .. }) {
        session
            .insert(session_keys::LAST_CART_ACTIVITY, now)
            .await?;
    }

    Ok(cart)
}

/// Work out who is asking, giving an anonymous session its cart key on
/// first use.
async fn requester(session: &Session) -> Result<CartRequester, AppError> {
    if let Some(user) = current_user(session).await {
        return Ok(CartRequester::User(user.id));
    }

    let session_key = match session.get::<String>(session_keys::CART_SESSION_KEY).await? {
        Some(key) => key,
        None => {
            let key = Uuid::new_v4().to_string();
            session
                .insert(session_keys::CART_SESSION_KEY, &key)
                .await?;
            key
        }
    };
    let last_activity = session
        .get::<DateTime<Utc>>(session_keys::LAST_CART_ACTIVITY)
        .await?;

    Ok(CartRequester::Anonymous {
        session_key,
        last_activity,
    })
}

/// Anonymous cart state held by a session, if it ever touched a cart.
///
/// Returns the cart key and the last cart access time.
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn anonymous_cart(
    session: &Session,
) -> Result<Option<(String, Option<DateTime<Utc>>)>, tower_sessions::session::Error> {
    let Some(key) = session.get::<String>(session_keys::CART_SESSION_KEY).await? else {
        return Ok(None);
    };
    let last_activity = session
        .get::<DateTime<Utc>>(session_keys::LAST_CART_ACTIVITY)
        .await?;
    Ok(Some((key, last_activity)))
}

/// Drop the anonymous cart binding from a session (after sign-in).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn forget_anonymous_cart(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<String>(session_keys::CART_SESSION_KEY)
        .await?;
    session
        .remove::<DateTime<Utc>>(session_keys::LAST_CART_ACTIVITY)
        .await?;
    Ok(())
}
