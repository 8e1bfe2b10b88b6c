//! Order confirmation view endpoints.
//!
//! Each `POST /order-confirmation` is one mount of the confirmation view.
//! Polling the mount renders it; it never triggers another reconciliation.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use checkout::{
    ConfirmationView, ConfirmedItem, InMemoryNavigator, OrderConfirmation, RenderedStatus,
    StatusTag,
};
use common::MountId;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::{AppState, MountedView};

/// Upper bound on how long `?wait=true` holds a request open.
const MAX_SETTLE_WAIT: Duration = Duration::from_secs(30);

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct RenderParams {
    #[serde(default)]
    pub wait: bool,
}

// -- Response types --

#[derive(Serialize)]
pub struct ConfirmationResponse {
    pub mount_id: String,
    pub status: StatusTag,
    pub message: String,
    pub simulated: bool,
    pub order: Option<OrderSummaryResponse>,
}

#[derive(Serialize)]
pub struct OrderSummaryResponse {
    pub order_ids: Vec<String>,
    pub total_cents: i64,
    pub total: String,
    pub delivery_date: Option<String>,
    pub status: String,
    pub items: Vec<ConfirmedItemResponse>,
}

#[derive(Serialize)]
pub struct ConfirmedItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

impl ConfirmationResponse {
    fn new(mount_id: MountId, rendered: RenderedStatus) -> Self {
        Self {
            mount_id: mount_id.to_string(),
            status: rendered.status,
            message: rendered.message,
            simulated: rendered.simulated,
            order: rendered.order.as_ref().map(OrderSummaryResponse::from),
        }
    }
}

impl From<&ConfirmedItem> for ConfirmedItemResponse {
    fn from(item: &ConfirmedItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
            total_cents: item.total_amount.cents(),
        }
    }
}

impl From<&OrderConfirmation> for OrderSummaryResponse {
    fn from(order: &OrderConfirmation) -> Self {
        Self {
            order_ids: order.order_ids().iter().map(ToString::to_string).collect(),
            total_cents: order.total_amount().cents(),
            total: order.total_amount().to_string(),
            delivery_date: order.delivery_date().map(|d| d.to_string()),
            status: order.status().to_string(),
            items: order.items().iter().map(ConfirmedItemResponse::from).collect(),
        }
    }
}

// -- Handlers --

/// POST /order-confirmation?session_id=... mounts a confirmation view.
///
/// Redirects (303) when the guard turns the shopper away; otherwise returns
/// the freshly mounted view, which is already processing.
#[tracing::instrument(skip_all)]
pub async fn mount(
    State(state): State<Arc<AppState>>,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    let navigator = InMemoryNavigator::new();
    let view = ConfirmationView::mount(query, state.confirmation_deps(&navigator));

    if let Some(route) = navigator.last() {
        return Redirect::to(route.path()).into_response();
    }

    let mount_id = view.id();
    let body = ConfirmationResponse::new(mount_id, view.render());
    state.evict_settled_views();
    state
        .views()
        .insert(mount_id, MountedView::new(view, navigator));

    (StatusCode::CREATED, Json(body)).into_response()
}

/// GET /order-confirmation/{mount_id} renders a mounted view.
///
/// With `?wait=true` the response is held until the view settles.
#[tracing::instrument(skip(state))]
pub async fn render(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<RenderParams>,
) -> Result<Json<ConfirmationResponse>, ApiError> {
    let mount_id = parse_mount_id(&id)?;

    if params.wait {
        let settled = state
            .views()
            .get(&mount_id)
            .map(|mounted| mounted.view.settled())
            .ok_or_else(|| mount_not_found(&id))?;
        if tokio::time::timeout(MAX_SETTLE_WAIT, settled).await.is_err() {
            tracing::debug!(%mount_id, "view still processing after wait");
        }
    }

    let views = state.views();
    let mounted = views.get(&mount_id).ok_or_else(|| mount_not_found(&id))?;
    Ok(Json(ConfirmationResponse::new(
        mount_id,
        mounted.view.render(),
    )))
}

/// POST /order-confirmation/{mount_id}/dismiss follows the view's dismiss action.
///
/// Navigating away unmounts the view.
#[tracing::instrument(skip(state))]
pub async fn dismiss(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Redirect, ApiError> {
    let mount_id = parse_mount_id(&id)?;

    let mut views = state.views();
    let mounted = views.get(&mount_id).ok_or_else(|| mount_not_found(&id))?;
    let route = mounted.view.dismiss().ok_or_else(|| {
        ApiError::Conflict("Order confirmation is still processing".to_string())
    })?;
    views.remove(&mount_id);

    Ok(Redirect::to(route.path()))
}

/// DELETE /order-confirmation/{mount_id} unmounts a view, discarding any
/// in-flight result.
#[tracing::instrument(skip(state))]
pub async fn unmount(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mount_id = parse_mount_id(&id)?;

    let mounted = state
        .views()
        .remove(&mount_id)
        .ok_or_else(|| mount_not_found(&id))?;
    mounted.view.unmount();

    Ok(StatusCode::NO_CONTENT)
}

fn mount_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Confirmation view {id} not found"))
}

fn parse_mount_id(id: &str) -> Result<MountId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(MountId::from(uuid))
}
