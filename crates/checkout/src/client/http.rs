//! HTTP reconciliation backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::OrderReconciliationClient;
use crate::confirmation::{OrderConfirmation, OrderConfirmationPayload};
use crate::error::ReconciliationError;
use crate::session::PaymentSession;

/// Detail reported when a rejection carries no readable body.
const DEFAULT_REJECTION_DETAIL: &str = "Failed to create order";

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    session_id: &'a str,
}

/// Reconciliation backend reached over HTTP.
///
/// Sends `POST {base_url}/orders` with `{"session_id": ...}` and expects the
/// created orders back. The request timeout is owned by the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpReconciliationClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpReconciliationClient {
    /// Creates a client with the HTTP library's default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Creates a client whose requests fail after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ReconciliationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReconciliationError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn orders_url(&self) -> String {
        format!("{}/orders", self.base_url.trim_end_matches('/'))
    }
}

/// Pulls a human-readable reason out of an error body.
///
/// The backend reports `{"detail": "..."}`; validation errors carry a list
/// under the same key, which is passed through as JSON.
fn rejection_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => DEFAULT_REJECTION_DETAIL.to_string(),
        },
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => DEFAULT_REJECTION_DETAIL.to_string(),
    }
}

#[async_trait]
impl OrderReconciliationClient for HttpReconciliationClient {
    #[tracing::instrument(skip_all, fields(session = %session.redacted()))]
    async fn confirm(
        &self,
        session: &PaymentSession,
    ) -> Result<OrderConfirmation, ReconciliationError> {
        let response = self
            .http
            .post(self.orders_url())
            .json(&CreateOrderRequest {
                session_id: session.as_str(),
            })
            .send()
            .await
            .map_err(|e| ReconciliationError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReconciliationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ReconciliationError::Rejected {
                status: status.as_u16(),
                detail: rejection_detail(&body),
            });
        }

        let payload: OrderConfirmationPayload = serde_json::from_str(&body)
            .map_err(|e| ReconciliationError::InvalidPayload(e.to_string()))?;
        tracing::debug!(orders = payload.order_ids.len(), "confirmation received");

        OrderConfirmation::try_from(payload)
    }
}
