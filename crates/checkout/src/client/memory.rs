//! In-memory reconciliation backend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId};
use tokio::sync::watch;

use super::OrderReconciliationClient;
use crate::confirmation::{ConfirmedItem, OrderConfirmation};
use crate::error::ReconciliationError;
use crate::session::PaymentSession;

#[derive(Debug, Default)]
struct InMemoryClientState {
    confirmed: HashMap<String, OrderConfirmation>,
    rejected: HashMap<String, ReconciliationError>,
    simulated: HashMap<String, Vec<ConfirmedItem>>,
    calls: Vec<String>,
    next_order: u32,
}

impl InMemoryClientState {
    fn next_order_id(&mut self) -> OrderId {
        self.next_order += 1;
        OrderId::new(format!("OC-{:04}", self.next_order))
    }

    /// Builds the confirmation for a simulated session: one order per
    /// checked-out line, or a single zero-total order for a token nobody
    /// checked out.
    fn simulate(&mut self, token: &str) -> Result<OrderConfirmation, ReconciliationError> {
        let Some(items) = self.simulated.get(token).cloned() else {
            let order_id = self.next_order_id();
            return OrderConfirmation::new(Money::zero(), vec![order_id]);
        };
        if items.is_empty() {
            return Err(ReconciliationError::InvalidPayload(
                "No items found in session.".to_string(),
            ));
        }

        let total = items.iter().map(|item| item.total_amount).sum();
        let order_ids = items.iter().map(|_| self.next_order_id()).collect();
        Ok(OrderConfirmation::new(total, order_ids)?.with_items(items))
    }
}

/// Idempotent in-memory reconciliation backend.
///
/// Registered sessions confirm to their registered order; simulated
/// (`mock_session_`) sessions confirm to a generated order that is memoised so
/// repeated calls see the same ids; anything else is rejected. A simulated
/// session opened with [`start_simulated_checkout`](Self::start_simulated_checkout)
/// confirms to the lines it was opened with. Responses can be held in flight
/// with [`hold_responses`](Self::hold_responses).
#[derive(Debug, Clone)]
pub struct InMemoryReconciliationClient {
    state: Arc<RwLock<InMemoryClientState>>,
    gate: Arc<watch::Sender<bool>>,
}

impl Default for InMemoryReconciliationClient {
    fn default() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            state: Arc::default(),
            gate: Arc::new(gate),
        }
    }
}

impl InMemoryReconciliationClient {
    /// Creates a new in-memory backend with no sessions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the confirmation returned for a session.
    pub fn register_session(&self, token: &str, confirmation: OrderConfirmation) {
        self.state
            .write()
            .unwrap()
            .confirmed
            .insert(token.to_string(), confirmation);
    }

    /// Configures the backend to reject a session with the given error.
    pub fn reject_session(&self, token: &str, error: ReconciliationError) {
        self.state
            .write()
            .unwrap()
            .rejected
            .insert(token.to_string(), error);
    }

    /// Opens a simulated checkout for the given lines and returns its session.
    pub fn start_simulated_checkout(&self, items: Vec<ConfirmedItem>) -> PaymentSession {
        let session = PaymentSession::new_simulated();
        tracing::debug!(session = %session.redacted(), lines = items.len(), "simulated checkout opened");
        self.state
            .write()
            .unwrap()
            .simulated
            .insert(session.as_str().to_string(), items);
        session
    }

    /// Holds every response until [`release_responses`](Self::release_responses).
    pub fn hold_responses(&self) {
        self.gate.send_replace(false);
    }

    /// Lets held and future responses through.
    pub fn release_responses(&self) {
        self.gate.send_replace(true);
    }

    /// Returns the total number of confirm calls.
    pub fn call_count(&self) -> usize {
        self.state.read().unwrap().calls.len()
    }

    /// Returns the number of confirm calls for one session token.
    pub fn calls_for(&self, token: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.as_str() == token)
            .count()
    }

    fn resolve(&self, session: &PaymentSession) -> Result<OrderConfirmation, ReconciliationError> {
        let mut state = self.state.write().unwrap();
        let token = session.as_str();

        if let Some(error) = state.rejected.get(token) {
            return Err(error.clone());
        }
        if let Some(confirmation) = state.confirmed.get(token) {
            return Ok(confirmation.clone());
        }
        if !session.is_simulated() {
            return Err(ReconciliationError::Rejected {
                status: 400,
                detail: "Checkout session not found".to_string(),
            });
        }

        let confirmation = state.simulate(token)?;
        state
            .confirmed
            .insert(token.to_string(), confirmation.clone());
        Ok(confirmation)
    }
}

#[async_trait]
impl OrderReconciliationClient for InMemoryReconciliationClient {
    async fn confirm(
        &self,
        session: &PaymentSession,
    ) -> Result<OrderConfirmation, ReconciliationError> {
        self.state
            .write()
            .unwrap()
            .calls
            .push(session.as_str().to_string());

        let mut gate = self.gate.subscribe();
        if gate.wait_for(|open| *open).await.is_err() {
            return Err(ReconciliationError::Transport(
                "reconciliation backend shut down".to_string(),
            ));
        }

        self.resolve(session)
    }
}
