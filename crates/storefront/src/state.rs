//! Shared application state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use cart::{CartClearer, CartStore};
use checkout::{
    ConfirmationDeps, ConfirmationView, InMemoryNavigator, InMemoryReconciliationClient,
    OrderReconciliationClient,
};
use common::MountId;

/// How long a settled confirmation view stays mounted when nobody dismisses it.
pub const DEFAULT_VIEW_TTL: Duration = Duration::from_secs(600);

/// Clears the cart and rewrites its snapshot so a restart cannot bring back
/// lines that were just ordered.
struct SnapshotClearer {
    cart: CartStore,
    path: PathBuf,
}

impl CartClearer for SnapshotClearer {
    fn clear(&self) {
        self.cart.clear();
        let written = self
            .cart
            .snapshot()
            .map_err(|e| e.to_string())
            .and_then(|snapshot| std::fs::write(&self.path, snapshot).map_err(|e| e.to_string()));
        if let Err(error) = written {
            tracing::warn!(path = %self.path.display(), %error, "failed to save cleared cart");
        }
    }
}

/// A mounted confirmation view and the navigator it reports to.
pub struct MountedView {
    pub view: ConfirmationView,
    pub navigator: InMemoryNavigator,
    /// When a sweep first saw the view in a terminal state.
    terminal_since: Option<Instant>,
}

impl MountedView {
    pub fn new(view: ConfirmationView, navigator: InMemoryNavigator) -> Self {
        Self {
            view,
            navigator,
            terminal_since: None,
        }
    }

    /// Returns true once the view has been terminal for at least `ttl`.
    fn expired(&mut self, now: Instant, ttl: Duration) -> bool {
        if !self.view.state().is_terminal() {
            return false;
        }
        let since = *self.terminal_since.get_or_insert(now);
        now.saturating_duration_since(since) >= ttl
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub cart: CartStore,
    pub client: Arc<dyn OrderReconciliationClient>,
    /// Which reconciliation backend is wired in, for diagnostics.
    pub backend_name: &'static str,
    /// Present when checkout is simulated in-process.
    simulator: Option<InMemoryReconciliationClient>,
    cart_snapshot_path: Option<PathBuf>,
    view_ttl: Duration,
    views: Mutex<HashMap<MountId, MountedView>>,
}

impl AppState {
    pub fn new(
        cart: CartStore,
        client: Arc<dyn OrderReconciliationClient>,
        backend_name: &'static str,
    ) -> Self {
        Self {
            cart,
            client,
            backend_name,
            simulator: None,
            cart_snapshot_path: None,
            view_ttl: DEFAULT_VIEW_TTL,
            views: Mutex::new(HashMap::new()),
        }
    }

    /// Reconciles against an in-process simulator that can also open checkouts.
    pub fn simulated(cart: CartStore, simulator: InMemoryReconciliationClient) -> Self {
        let mut state = Self::new(cart, Arc::new(simulator.clone()), "memory");
        state.simulator = Some(simulator);
        state
    }

    /// Sets how long a settled view survives without being dismissed.
    pub fn with_view_ttl(mut self, ttl: Duration) -> Self {
        self.view_ttl = ttl;
        self
    }

    /// Persists the cart to `path` after every cart change.
    pub fn with_cart_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cart_snapshot_path = Some(path.into());
        self
    }

    pub fn simulator(&self) -> Option<&InMemoryReconciliationClient> {
        self.simulator.as_ref()
    }

    pub fn cart_snapshot_path(&self) -> Option<&Path> {
        self.cart_snapshot_path.as_deref()
    }

    pub fn view_ttl(&self) -> Duration {
        self.view_ttl
    }

    /// Builds the collaborators for one confirmation view mount.
    pub fn confirmation_deps(&self, navigator: &InMemoryNavigator) -> ConfirmationDeps {
        let cart: Arc<dyn CartClearer> = match &self.cart_snapshot_path {
            Some(path) => Arc::new(SnapshotClearer {
                cart: self.cart.clone(),
                path: path.clone(),
            }),
            None => Arc::new(self.cart.clone()),
        };
        ConfirmationDeps::new(self.client.clone(), cart, Arc::new(navigator.clone()))
    }

    /// Locks the table of mounted views. Never hold the guard across an await.
    pub fn views(&self) -> MutexGuard<'_, HashMap<MountId, MountedView>> {
        self.views.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the number of currently mounted confirmation views.
    pub fn mounted_view_count(&self) -> usize {
        self.views().len()
    }

    /// Unmounts views that have stayed settled for the configured TTL.
    ///
    /// Views still processing are never evicted. Returns how many were removed.
    pub fn evict_settled_views(&self) -> usize {
        let now = Instant::now();
        let ttl = self.view_ttl;
        let mut views = self.views();
        let before = views.len();
        views.retain(|_, mounted| !mounted.expired(now, ttl));
        let evicted = before - views.len();

        if evicted > 0 {
            tracing::debug!(evicted, remaining = views.len(), "evicted settled confirmation views");
            metrics::counter!("confirmation_views_evicted_total").increment(evicted as u64);
        }
        evicted
    }
}
