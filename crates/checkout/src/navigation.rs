//! Navigation guard for the confirmation view.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::session::PaymentSession;
use crate::state::ReconciliationState;

/// Routes the confirmation view can send the shopper to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Route {
    Home,
    Cart,
    OrderConfirmation,
}

impl Route {
    /// Returns the route path.
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Cart => "/cart",
            Route::OrderConfirmation => "/order-confirmation",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Performs client-side navigation.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Admits a mount into reconciliation, or names where to redirect instead.
///
/// Without a session there is nothing to reconcile, so the view redirects
/// home before rendering anything.
pub fn admit(session: Option<PaymentSession>) -> Result<PaymentSession, Route> {
    session.ok_or(Route::Home)
}

/// Where the dismiss action of a state leads.
///
/// A confirmed order continues shopping; a failed one goes back to the cart so
/// checkout can be retried without browsing the catalog again. Non-terminal
/// states have no dismiss action.
pub fn dismiss_target(state: &ReconciliationState) -> Option<Route> {
    match state {
        ReconciliationState::Succeeded { .. } => Some(Route::Home),
        ReconciliationState::Failed { .. } => Some(Route::Cart),
        ReconciliationState::Idle | ReconciliationState::Processing { .. } => None,
    }
}

/// Navigator that records every navigation, for tests and headless hosts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNavigator {
    history: Arc<RwLock<Vec<Route>>>,
}

impl InMemoryNavigator {
    /// Creates a navigator with an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every route navigated to, oldest first.
    pub fn history(&self) -> Vec<Route> {
        self.history.read().unwrap().clone()
    }

    /// Returns the most recent route.
    pub fn last(&self) -> Option<Route> {
        self.history.read().unwrap().last().copied()
    }
}

impl Navigator for InMemoryNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(%route, "navigate");
        self.history.write().unwrap().push(route);
    }
}
