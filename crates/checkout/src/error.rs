//! Reconciliation error types.

use thiserror::Error;

/// Ways the order reconciliation backend can fail to confirm a session.
///
/// The confirmation view renders all of them the same way; the variants only
/// matter for logs and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    /// The request never produced a response (connect failure, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("Reconciliation rejected with status {status}: {detail}")]
    Rejected { status: u16, detail: String },

    /// The backend answered 2xx but the body is not a usable confirmation.
    #[error("Invalid confirmation payload: {0}")]
    InvalidPayload(String),
}

impl ReconciliationError {
    /// Short label used as a metrics/log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ReconciliationError::Transport(_) => "transport",
            ReconciliationError::Rejected { .. } => "rejected",
            ReconciliationError::InvalidPayload(_) => "invalid_payload",
        }
    }
}

/// Convenience type alias for reconciliation results.
pub type Result<T> = std::result::Result<T, ReconciliationError>;
