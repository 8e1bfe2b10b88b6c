//! Reconciliation state machine.

use serde::{Deserialize, Serialize};

use crate::confirmation::OrderConfirmation;

/// Shown while the backend verifies the payment.
pub const PROCESSING_MESSAGE: &str = "Verifying your payment...";

/// Shown once the order is confirmed.
pub const SUCCESS_MESSAGE: &str = "Thank you for your purchase!";

/// Shown for every kind of reconciliation failure.
pub const FAILURE_MESSAGE: &str =
    "There was an issue processing your order. Please contact support.";

/// The state of one confirmation view mount.
///
/// State transitions:
/// ```text
/// (mount) ──┬──► Idle                      no session, redirect home
///           └──► Processing ──┬──► Succeeded
///                             └──► Failed
/// ```
///
/// `Processing` is entered once per mount and never re-entered by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationState {
    /// No payment session was supplied (terminal state).
    Idle,

    /// The reconciliation call is in flight.
    Processing { message: String },

    /// The backend confirmed the order (terminal state).
    Succeeded { order: OrderConfirmation },

    /// The backend could not confirm the order (terminal state).
    Failed { message: String },
}

impl ReconciliationState {
    /// The state a mount with a session starts in.
    pub fn processing() -> Self {
        ReconciliationState::Processing {
            message: PROCESSING_MESSAGE.to_string(),
        }
    }

    /// The success state carrying the confirmed order.
    pub fn succeeded(order: OrderConfirmation) -> Self {
        ReconciliationState::Succeeded { order }
    }

    /// The generic failure state.
    pub fn failed() -> Self {
        ReconciliationState::Failed {
            message: FAILURE_MESSAGE.to_string(),
        }
    }

    /// Returns true if a reconciliation outcome may still be applied.
    pub fn can_resolve(&self) -> bool {
        matches!(self, ReconciliationState::Processing { .. })
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.can_resolve()
    }

    /// Returns the status tag rendered to the surrounding UI.
    pub fn status(&self) -> StatusTag {
        match self {
            ReconciliationState::Idle => StatusTag::Idle,
            ReconciliationState::Processing { .. } => StatusTag::Processing,
            ReconciliationState::Succeeded { .. } => StatusTag::Success,
            ReconciliationState::Failed { .. } => StatusTag::Error,
        }
    }

    /// Returns the user-facing message for this state.
    pub fn message(&self) -> &str {
        match self {
            ReconciliationState::Idle => "",
            ReconciliationState::Processing { message } => message,
            ReconciliationState::Succeeded { .. } => SUCCESS_MESSAGE,
            ReconciliationState::Failed { message } => message,
        }
    }

    /// Returns the confirmed order, if any.
    pub fn order(&self) -> Option<&OrderConfirmation> {
        match self {
            ReconciliationState::Succeeded { order } => Some(order),
            _ => None,
        }
    }
}

/// Status tag of the confirmation view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    Idle,
    Processing,
    Success,
    Error,
}

impl StatusTag {
    /// Returns the tag as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusTag::Idle => "idle",
            StatusTag::Processing => "processing",
            StatusTag::Success => "success",
            StatusTag::Error => "error",
        }
    }
}

impl std::fmt::Display for StatusTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Money, OrderId};

    fn order() -> OrderConfirmation {
        OrderConfirmation::new(Money::from_cents(12999), vec![OrderId::new("OC-1")]).unwrap()
    }

    #[test]
    fn test_only_processing_can_resolve() {
        assert!(ReconciliationState::processing().can_resolve());
        assert!(!ReconciliationState::Idle.can_resolve());
        assert!(!ReconciliationState::succeeded(order()).can_resolve());
        assert!(!ReconciliationState::failed().can_resolve());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ReconciliationState::processing().is_terminal());
        assert!(ReconciliationState::Idle.is_terminal());
        assert!(ReconciliationState::succeeded(order()).is_terminal());
        assert!(ReconciliationState::failed().is_terminal());
    }

    #[test]
    fn test_messages() {
        assert_eq!(ReconciliationState::processing().message(), PROCESSING_MESSAGE);
        assert_eq!(
            ReconciliationState::succeeded(order()).message(),
            SUCCESS_MESSAGE
        );
        assert_eq!(ReconciliationState::failed().message(), FAILURE_MESSAGE);
    }

    #[test]
    fn test_status_tags() {
        assert_eq!(ReconciliationState::Idle.status(), StatusTag::Idle);
        assert_eq!(
            ReconciliationState::processing().status(),
            StatusTag::Processing
        );
        assert_eq!(
            ReconciliationState::succeeded(order()).status(),
            StatusTag::Success
        );
        assert_eq!(ReconciliationState::failed().status(), StatusTag::Error);
    }

    #[test]
    fn test_order_only_on_success() {
        assert!(ReconciliationState::succeeded(order()).order().is_some());
        assert!(ReconciliationState::failed().order().is_none());
        assert!(ReconciliationState::processing().order().is_none());
    }

    #[test]
    fn test_status_tag_serialization() {
        assert_eq!(
            serde_json::to_string(&StatusTag::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(StatusTag::Error.to_string(), "error");
    }
}
