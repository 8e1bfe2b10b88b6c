//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cart::{CartClearer, CartItem, CartProduct, CartStore};
use checkout::{ConfirmedItem, Route};
use common::Money;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub name: String,
    pub price_cents: i64,
    pub stock: u32,
    #[serde(default)]
    pub is_preorder: bool,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLineResponse>,
    pub count: u32,
    pub total_cents: i64,
    pub total: String,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub is_preorder: bool,
}

impl From<&CartItem> for CartLineResponse {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product.product_id.clone(),
            name: item.product.name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.product.price.cents(),
            line_total_cents: item.line_total().cents(),
            is_preorder: item.product.is_preorder,
        }
    }
}

impl From<&CartStore> for CartResponse {
    fn from(cart: &CartStore) -> Self {
        let total = cart.total();
        Self {
            items: cart.items().iter().map(CartLineResponse::from).collect(),
            count: cart.count(),
            total_cents: total.cents(),
            total: total.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub checkout_url: String,
}

/// Writes the cart snapshot when persistence is configured.
async fn persist(state: &AppState) -> Result<(), ApiError> {
    match state.cart_snapshot_path() {
        Some(path) => crate::save_cart(&state.cart, path).await,
        None => Ok(()),
    }
}

// -- Handlers --

/// GET /cart
pub async fn get(State(state): State<Arc<AppState>>) -> Json<CartResponse> {
    Json(CartResponse::from(&state.cart))
}

/// POST /cart/items adds a product, merging with an existing line.
#[tracing::instrument(skip(state, req), fields(product_id = %req.product_id))]
pub async fn add(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    if req.price_cents < 0 {
        return Err(ApiError::BadRequest("price_cents must not be negative".into()));
    }
    if req.quantity == 0 {
        return Err(ApiError::BadRequest("quantity must be at least 1".into()));
    }

    let mut product = CartProduct::new(
        req.product_id,
        req.name,
        Money::from_cents(req.price_cents),
        req.stock,
    );
    if req.is_preorder {
        product = product.preorder();
    }
    state.cart.add(product, req.quantity)?;
    persist(&state).await?;

    Ok(Json(CartResponse::from(&state.cart)))
}

/// PUT /cart/items/{product_id} sets a line's quantity; zero removes it.
#[tracing::instrument(skip(state, req))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    state.cart.update_quantity(&product_id, req.quantity)?;
    persist(&state).await?;
    Ok(Json(CartResponse::from(&state.cart)))
}

/// DELETE /cart/items/{product_id}
#[tracing::instrument(skip(state))]
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    if !state.cart.remove(&product_id) {
        return Err(ApiError::NotFound(format!(
            "Product {product_id} is not in the cart"
        )));
    }
    persist(&state).await?;
    Ok(Json(CartResponse::from(&state.cart)))
}

/// DELETE /cart empties the cart.
#[tracing::instrument(skip(state))]
pub async fn clear(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    CartClearer::clear(&state.cart);
    persist(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /cart/checkout opens a simulated payment for the current cart.
///
/// Only available when checkout is simulated in-process. The returned URL is
/// where the payment provider would send the shopper back to; the cart stays
/// as it is until that confirmation succeeds.
#[tracing::instrument(skip(state))]
pub async fn checkout(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let simulator = state.simulator().ok_or_else(|| {
        ApiError::Conflict("Checkout is handled by the payment provider".to_string())
    })?;

    let items: Vec<ConfirmedItem> = state
        .cart
        .items()
        .iter()
        .map(|line| ConfirmedItem {
            product_id: line.product.product_id.clone(),
            product_name: line.product.name.clone(),
            quantity: line.quantity,
            unit_price: line.product.price,
            total_amount: line.line_total(),
        })
        .collect();
    if items.is_empty() {
        return Err(ApiError::BadRequest("Cart is empty".to_string()));
    }

    let session = simulator.start_simulated_checkout(items);
    let checkout_url = format!(
        "{}?session_id={}",
        Route::OrderConfirmation.path(),
        session.as_str()
    );
    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            session_id: session.as_str().to_string(),
            checkout_url,
        }),
    ))
}
