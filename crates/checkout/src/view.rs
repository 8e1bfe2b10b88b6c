//! Confirmation view: the per-mount reconciliation state machine.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use cart::CartClearer;
use common::MountId;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::OrderReconciliationClient;
use crate::confirmation::OrderConfirmation;
use crate::navigation::{self, Navigator, Route};
use crate::session::{self, PaymentSession};
use crate::state::{ReconciliationState, StatusTag};

/// Collaborators of the confirmation view.
///
/// The view only ever sees the cart through [`CartClearer`].
#[derive(Clone)]
pub struct ConfirmationDeps {
    pub client: Arc<dyn OrderReconciliationClient>,
    pub cart: Arc<dyn CartClearer>,
    pub navigator: Arc<dyn Navigator>,
}

impl ConfirmationDeps {
    pub fn new(
        client: Arc<dyn OrderReconciliationClient>,
        cart: Arc<dyn CartClearer>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            client,
            cart,
            navigator,
        }
    }
}

/// What the surrounding UI renders for the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStatus {
    pub status: StatusTag,
    pub message: String,
    /// Present only on success.
    pub order: Option<OrderConfirmation>,
    /// True only on success of a simulated session.
    pub simulated: bool,
}

/// Liveness flag of one reconciliation attempt.
///
/// The task applies its outcome while holding the lock and teardown clears
/// the flag under the same lock, so an outcome is applied either completely
/// before teardown or not at all.
#[derive(Debug, Clone)]
struct MountGuard(Arc<Mutex<bool>>);

impl MountGuard {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(true)))
    }

    fn deactivate(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    fn run_if_active<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let active = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if *active { Some(f()) } else { None }
    }
}

/// The single reconciliation call issued for one session token.
struct Attempt {
    session: PaymentSession,
    guard: MountGuard,
    task: JoinHandle<()>,
}

impl Attempt {
    fn cancel(self) {
        if !self.task.is_finished() {
            tracing::debug!(session = %self.session.redacted(), "cancelling in-flight reconciliation");
        }
        self.guard.deactivate();
        self.task.abort();
    }
}

/// Everything the background task needs to resolve one attempt.
struct Reconciliation {
    mount_id: MountId,
    session: PaymentSession,
    client: Arc<dyn OrderReconciliationClient>,
    cart: Arc<dyn CartClearer>,
    guard: MountGuard,
    state: Arc<watch::Sender<ReconciliationState>>,
}

impl Reconciliation {
    #[tracing::instrument(
        name = "reconcile",
        skip_all,
        fields(
            mount_id = %self.mount_id,
            session = %self.session.redacted(),
            simulated = self.session.is_simulated(),
        )
    )]
    async fn run(self) {
        metrics::counter!("reconciliation_started_total").increment(1);
        let started = Instant::now();

        let outcome = self.client.confirm(&self.session).await;
        metrics::histogram!("reconciliation_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let applied = self.guard.run_if_active(|| match outcome {
            Ok(order) => {
                tracing::info!(
                    orders = order.order_ids().len(),
                    total = %order.total_amount(),
                    "payment reconciled"
                );
                // Publish first; the cart is only cleared once success is observable.
                self.state.send_replace(ReconciliationState::succeeded(order));
                self.cart.clear();
                metrics::counter!("reconciliation_succeeded").increment(1);
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "payment reconciliation failed");
                self.state.send_replace(ReconciliationState::failed());
                metrics::counter!("reconciliation_failed", "kind" => e.kind()).increment(1);
            }
        });

        if applied.is_none() {
            tracing::debug!("view no longer mounted, discarding reconciliation result");
            metrics::counter!("reconciliation_discarded").increment(1);
        }
    }
}

/// Read-only handle on a view's state, usable after the view has moved.
#[derive(Debug, Clone)]
pub struct StateWatch {
    rx: watch::Receiver<ReconciliationState>,
}

impl StateWatch {
    /// Returns the current state.
    pub fn current(&self) -> ReconciliationState {
        self.rx.borrow().clone()
    }

    /// Waits until the state is terminal.
    ///
    /// If the view is torn down first, returns the last published state.
    pub async fn settled(mut self) -> ReconciliationState {
        let settled = self
            .rx
            .wait_for(ReconciliationState::is_terminal)
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.current())
    }
}

/// One mount of the order confirmation view.
///
/// Mounting resolves the payment session from the route's query parameters.
/// Without one the view goes `Idle` and redirects home. With one it enters
/// `Processing` and spawns exactly one reconciliation task. Rendering never
/// issues calls; [`update`](Self::update) only restarts when the session
/// token itself changes. Dropping the view cancels an in-flight call and
/// discards its result.
///
/// Must be mounted from within a Tokio runtime.
pub struct ConfirmationView {
    id: MountId,
    deps: ConfirmationDeps,
    state: Arc<watch::Sender<ReconciliationState>>,
    attempt: Option<Attempt>,
}

impl ConfirmationView {
    /// Mounts the view for the given route query parameters.
    pub fn mount<I, K, V>(query: I, deps: ConfirmationDeps) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let (state, _) = watch::channel(ReconciliationState::Idle);
        let mut view = Self {
            id: MountId::new(),
            deps,
            state: Arc::new(state),
            attempt: None,
        };
        view.start(session::resolve(query));
        view
    }

    fn start(&mut self, session: Option<PaymentSession>) {
        let session = match navigation::admit(session) {
            Ok(session) => session,
            Err(route) => {
                self.state.send_replace(ReconciliationState::Idle);
                metrics::counter!("confirmation_redirects_total").increment(1);
                tracing::info!(mount_id = %self.id, %route, "no payment session, redirecting");
                self.deps.navigator.navigate(route);
                return;
            }
        };

        tracing::info!(
            mount_id = %self.id,
            session = %session.redacted(),
            "confirmation view mounted"
        );
        self.state.send_replace(ReconciliationState::processing());

        let guard = MountGuard::new();
        let task = tokio::spawn(
            Reconciliation {
                mount_id: self.id,
                session: session.clone(),
                client: self.deps.client.clone(),
                cart: self.deps.cart.clone(),
                guard: guard.clone(),
                state: self.state.clone(),
            }
            .run(),
        );

        self.attempt = Some(Attempt {
            session,
            guard,
            task,
        });
    }

    fn teardown(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            attempt.cancel();
        }
    }

    /// Applies new navigation state to the mounted view.
    ///
    /// Keyed on the session token alone: the same token is a no-op however
    /// often it is called. A different token cancels the current attempt and
    /// starts over in `Processing`; a vanished token redirects home.
    pub fn update<I, K, V>(&mut self, query: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let next = session::resolve(query);
        if self.session() == next.as_ref() {
            return;
        }

        tracing::info!(mount_id = %self.id, "payment session changed, restarting reconciliation");
        self.teardown();
        self.start(next);
    }

    /// Returns the mount identifier.
    pub fn id(&self) -> MountId {
        self.id
    }

    /// Returns the session being reconciled, if any.
    pub fn session(&self) -> Option<&PaymentSession> {
        self.attempt.as_ref().map(|attempt| &attempt.session)
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> ReconciliationState {
        self.state.borrow().clone()
    }

    /// Returns a handle that observes this view's state.
    pub fn watch(&self) -> StateWatch {
        StateWatch {
            rx: self.state.subscribe(),
        }
    }

    /// Waits until the view reaches a terminal state.
    pub fn settled(&self) -> impl Future<Output = ReconciliationState> + Send + 'static {
        self.watch().settled()
    }

    /// Renders the current state. Never issues a reconciliation call.
    pub fn render(&self) -> RenderedStatus {
        let state = self.state();
        let order = state.order().cloned();
        let simulated =
            order.is_some() && self.session().is_some_and(PaymentSession::is_simulated);

        RenderedStatus {
            status: state.status(),
            message: state.message().to_string(),
            order,
            simulated,
        }
    }

    /// Shopper dismissal of a terminal state.
    ///
    /// Success continues shopping at home, failure returns to the cart.
    /// Returns the route navigated to, or `None` while still processing.
    pub fn dismiss(&self) -> Option<Route> {
        let route = navigation::dismiss_target(&self.state.borrow())?;
        tracing::debug!(mount_id = %self.id, %route, "confirmation dismissed");
        self.deps.navigator.navigate(route);
        Some(route)
    }

    /// Unmounts the view. Equivalent to dropping it.
    pub fn unmount(self) {
        tracing::debug!(mount_id = %self.id, "unmounting confirmation view");
    }
}

impl Drop for ConfirmationView {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for ConfirmationView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationView")
            .field("id", &self.id)
            .field("session", &self.session().map(PaymentSession::redacted))
            .field("state", &self.state.borrow().status())
            .finish()
    }
}
