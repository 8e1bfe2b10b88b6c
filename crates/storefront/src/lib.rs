//! HTTP shell for the storefront's cart and order confirmation views.
//!
//! Hosts one cart per process and any number of mounted confirmation views,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post, put};
use cart::CartStore;
use checkout::{HttpReconciliationClient, InMemoryReconciliationClient, ReconciliationError};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use error::ApiError;
pub use state::{AppState, MountedView};

/// Upper bound on the pause between two sweeps of settled views.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let app = Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/order-confirmation",
            post(routes::confirmation::mount),
        )
        .route(
            "/order-confirmation/{mount_id}",
            get(routes::confirmation::render).delete(routes::confirmation::unmount),
        )
        .route(
            "/order-confirmation/{mount_id}/dismiss",
            post(routes::confirmation::dismiss),
        )
        .route(
            "/cart",
            get(routes::cart::get).delete(routes::cart::clear),
        )
        .route("/cart/items", post(routes::cart::add))
        .route("/cart/checkout", post(routes::cart::checkout))
        .route(
            "/cart/items/{product_id}",
            put(routes::cart::update).delete(routes::cart::remove),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    with_error_boundary(app)
}

/// Wraps a router so a panicking handler yields a generic 500 instead of a
/// dropped connection.
pub fn with_error_boundary(router: Router) -> Router {
    router.layer(CatchPanicLayer::custom(error::panic_response))
}

/// Creates the application state with the reconciliation backend chosen by
/// the configuration.
pub fn create_default_state(
    config: &Config,
    cart: CartStore,
) -> Result<Arc<AppState>, ReconciliationError> {
    let mut state = if config.mock_checkout {
        AppState::simulated(cart, InMemoryReconciliationClient::new())
    } else {
        let client =
            HttpReconciliationClient::with_timeout(&config.api_url, config.reconciliation_timeout)?;
        AppState::new(cart, Arc::new(client), "http")
    }
    .with_view_ttl(config.view_ttl);

    if let Some(path) = &config.cart_snapshot_path {
        state = state.with_cart_snapshot_path(path);
    }
    Ok(Arc::new(state))
}

/// Periodically unmounts confirmation views that settled and were abandoned.
pub fn spawn_view_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let every = state
        .view_ttl()
        .min(MAX_SWEEP_INTERVAL)
        .max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            state.evict_settled_views();
        }
    })
}

/// Restores the cart from a snapshot file, starting empty when the file is
/// missing or unreadable.
pub async fn load_cart(path: Option<&Path>) -> CartStore {
    let Some(path) = path else {
        return CartStore::new();
    };
    match tokio::fs::read_to_string(path).await {
        Ok(snapshot) => CartStore::restore(&snapshot),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CartStore::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read cart snapshot");
            CartStore::new()
        }
    }
}

/// Writes the cart snapshot so the next start restores it.
pub async fn save_cart(cart: &CartStore, path: &Path) -> Result<(), ApiError> {
    let snapshot = cart.snapshot()?;
    tokio::fs::write(path, snapshot).await.map_err(|e| {
        ApiError::Internal(format!("failed to write cart snapshot {}: {e}", path.display()))
    })?;
    tracing::debug!(path = %path.display(), items = cart.count(), "cart snapshot saved");
    Ok(())
}
