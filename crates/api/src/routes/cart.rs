//! Cart route handlers.
//!
//! Every handler works on the caller's cart and answers with the full cart
//! view. Mutations that take input validate it before the cart is resolved.
//! Integer fields accept JSON numbers or numeric strings.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use tower_sessions::Session;
use tracing::instrument;

use novel_cart_core::{CartItemId, NovelId, Quantity, QuantityDelta, parse_integer};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{CurrentCart, resolve_cart};
use crate::models::CartView;
use crate::services::CartService;
use crate::state::AppState;

/// Body of `POST /cart/add_item`.
#[derive(Debug, Deserialize)]
pub struct AddItemBody {
    pub novel_id: Option<Value>,
    /// Defaults to 1.
    pub quantity: Option<Value>,
}

/// Body of `PUT /cart/update_item`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemBody {
    pub item_id: Option<Value>,
    /// Signed change to apply, not the new quantity.
    pub quantity: Option<Value>,
}

/// Query of `DELETE /cart/remove_item`.
#[derive(Debug, Deserialize)]
pub struct RemoveItemParams {
    pub item_id: Option<String>,
}

/// A present, non-empty JSON field.
fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !matches!(v, Value::Null) && v.as_str() != Some(""))
}

fn integer(value: &Value, field: &str) -> Result<i64> {
    parse_integer(value).ok_or_else(|| AppError::BadRequest(format!("{field} must be an integer")))
}

fn service(state: &AppState) -> CartService<'_> {
    CartService::new(state.pool(), state.cart_policy())
}

/// Show the cart.
#[instrument(skip(state, cart), fields(cart_id = %cart.id))]
pub async fn show(
    State(state): State<AppState>,
    CurrentCart(cart): CurrentCart,
) -> Result<Json<CartView>> {
    Ok(Json(service(&state).view(&cart).await?))
}

/// Add copies of a novel to the cart.
#[instrument(skip(state, session, body))]
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    body: std::result::Result<Json<AddItemBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CartView>)> {
    let Json(body) = body?;

    let novel_id = present(body.novel_id)
        .ok_or_else(|| AppError::BadRequest("novel_id is required".to_string()))?;
    let novel_id = NovelId::new(integer(&novel_id, "novel_id")?);

    let quantity = match present(body.quantity) {
        Some(value) => Quantity::from_json(&value)?,
        None => Quantity::ONE,
    };

    let cart = resolve_cart(&state, &session).await?;
    let view = service(&state).add(&cart, novel_id, quantity).await?;

    add_breadcrumb(
        "cart",
        "Added novel to cart",
        Some(&[
            ("novel_id", &novel_id.to_string()),
            ("quantity", &quantity.get().to_string()),
        ]),
    );

    Ok((StatusCode::CREATED, Json(view)))
}

/// Change a line's quantity by a signed amount.
#[instrument(skip(state, session, body))]
pub async fn update_item(
    State(state): State<AppState>,
    session: Session,
    body: std::result::Result<Json<UpdateItemBody>, JsonRejection>,
) -> Result<Json<CartView>> {
    let Json(body) = body?;

    let (Some(item_id), Some(quantity)) = (present(body.item_id), present(body.quantity)) else {
        return Err(AppError::BadRequest(
            "item_id and quantity are required".to_string(),
        ));
    };
    let item_id = CartItemId::new(integer(&item_id, "item_id")?);
    let delta = QuantityDelta::from_json(&quantity)?;

    let cart = resolve_cart(&state, &session).await?;
    Ok(Json(service(&state).adjust(&cart, item_id, delta).await?))
}

/// Delete a line.
#[instrument(skip(state, session))]
pub async fn remove_item(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<RemoveItemParams>,
) -> Result<Json<CartView>> {
    let item_id = params
        .item_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("item_id is required".to_string()))?;
    let item_id = CartItemId::new(integer(&Value::String(item_id), "item_id")?);

    let cart = resolve_cart(&state, &session).await?;
    Ok(Json(service(&state).remove(&cart, item_id).await?))
}

/// Delete every line.
#[instrument(skip(state, cart), fields(cart_id = %cart.id))]
pub async fn clear(
    State(state): State<AppState>,
    CurrentCart(cart): CurrentCart,
) -> Result<Json<CartView>> {
    Ok(Json(service(&state).clear(&cart).await?))
}
