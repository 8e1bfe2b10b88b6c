//! Payment session token resolution.

/// Query parameter the payment provider appends to the confirmation route.
pub const SESSION_QUERY_PARAM: &str = "session_id";

/// Prefix reserved for test-mode sessions issued without a real provider.
pub const SIMULATED_SESSION_PREFIX: &str = "mock_session_";

/// Opaque payment session token handed back by the payment provider.
///
/// Never empty. The raw value is only ever sent to the reconciliation
/// backend; logs use [`PaymentSession::redacted`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaymentSession(String);

impl PaymentSession {
    /// Wraps a raw token. Returns `None` for an empty or blank value.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Creates a fresh test-mode session token.
    pub fn new_simulated() -> Self {
        Self(format!("{SIMULATED_SESSION_PREFIX}{}", uuid::Uuid::new_v4()))
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for test-mode sessions.
    pub fn is_simulated(&self) -> bool {
        self.0.starts_with(SIMULATED_SESSION_PREFIX)
    }

    /// Returns a log-safe rendering of the token.
    pub fn redacted(&self) -> String {
        let visible: String = self.0.chars().take(8).collect();
        format!("{visible}***")
    }
}

/// Extracts the payment session from the confirmation route's query parameters.
///
/// The first `session_id` parameter wins. Returns `None` when it is absent or
/// blank; a missing session is a normal outcome, not an error.
pub fn resolve<I, K, V>(query: I) -> Option<PaymentSession>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    query
        .into_iter()
        .find(|(key, _)| key.as_ref() == SESSION_QUERY_PARAM)
        .and_then(|(_, value)| PaymentSession::new(value.as_ref()))
}
