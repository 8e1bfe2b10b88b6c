//! Order reconciliation backend: trait and implementations.

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::confirmation::OrderConfirmation;
use crate::error::ReconciliationError;
use crate::session::PaymentSession;

pub use http::HttpReconciliationClient;
pub use memory::InMemoryReconciliationClient;

/// Converts a payment session into the orders created for it.
///
/// Implementations must be idempotent per session: calling `confirm` again
/// with the same token returns the same orders instead of creating new ones.
/// A page reload re-submits the token, and the confirmation view does not
/// deduplicate across mounts.
#[async_trait]
pub trait OrderReconciliationClient: Send + Sync {
    /// Confirms the session. One request, one response; no polling.
    async fn confirm(
        &self,
        session: &PaymentSession,
    ) -> Result<OrderConfirmation, ReconciliationError>;
}
