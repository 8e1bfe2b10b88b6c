//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub checkout_backend: &'static str,
    pub mounted_views: usize,
}

/// GET /health: liveness plus which reconciliation backend is wired in.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        checkout_backend: state.backend_name,
        mounted_views: state.mounted_view_count(),
    })
}
