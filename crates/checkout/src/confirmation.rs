//! Confirmed order payload.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use common::{Money, OrderId};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{ReconciliationError, Result};

/// Order status reported when the backend omits one.
const DEFAULT_ORDER_STATUS: &str = "PENDING";

/// One line of a confirmed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_amount: Money,
}

/// The outcome of a successful reconciliation.
///
/// One payment session may fan out into several backend orders, so the
/// identifier list holds every order created for it. It is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    total_amount: Money,
    delivery_date: Option<NaiveDate>,
    order_ids: Vec<OrderId>,
    items: Vec<ConfirmedItem>,
    status: String,
}

impl OrderConfirmation {
    /// Creates a confirmation, rejecting a negative total or an empty order list.
    pub fn new(total_amount: Money, order_ids: Vec<OrderId>) -> Result<Self> {
        if total_amount.is_negative() {
            return Err(ReconciliationError::InvalidPayload(format!(
                "negative total amount {total_amount}"
            )));
        }
        if order_ids.is_empty() {
            return Err(ReconciliationError::InvalidPayload(
                "confirmation carries no order ids".to_string(),
            ));
        }

        Ok(Self {
            total_amount,
            delivery_date: None,
            order_ids,
            items: Vec::new(),
            status: DEFAULT_ORDER_STATUS.to_string(),
        })
    }

    /// Sets the estimated delivery date.
    pub fn with_delivery_date(mut self, date: NaiveDate) -> Self {
        self.delivery_date = Some(date);
        self
    }

    /// Sets the confirmed lines.
    pub fn with_items(mut self, items: Vec<ConfirmedItem>) -> Self {
        self.items = items;
        self
    }

    /// Sets the backend order status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn delivery_date(&self) -> Option<NaiveDate> {
        self.delivery_date
    }

    pub fn order_ids(&self) -> &[OrderId] {
        &self.order_ids
    }

    pub fn items(&self) -> &[ConfirmedItem] {
        &self.items
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Order identifiers joined for display, e.g. `"OC-1, OC-2"`.
    pub fn order_ids_display(&self) -> String {
        self.order_ids
            .iter()
            .map(OrderId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Wire form of a confirmation as returned by `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderConfirmationPayload {
    pub order_ids: Vec<String>,
    #[serde(default)]
    pub items: Vec<ConfirmedItemPayload>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Wire form of one confirmed line.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmedItemPayload {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

fn money(amount: Decimal, field: &str) -> Result<Money> {
    Money::from_decimal(amount).ok_or_else(|| {
        ReconciliationError::InvalidPayload(format!("{field} out of range: {amount}"))
    })
}

/// Parses the backend's ISO-8601 delivery timestamp into the local calendar date.
fn parse_delivery_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date())
        })
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

impl TryFrom<ConfirmedItemPayload> for ConfirmedItem {
    type Error = ReconciliationError;

    fn try_from(item: ConfirmedItemPayload) -> Result<Self> {
        Ok(Self {
            unit_price: money(item.unit_price, "unit_price")?,
            total_amount: money(item.total_amount, "item total_amount")?,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
        })
    }
}

impl TryFrom<OrderConfirmationPayload> for OrderConfirmation {
    type Error = ReconciliationError;

    fn try_from(payload: OrderConfirmationPayload) -> Result<Self> {
        // An empty result (e.g. status `EMPTY`) explains itself in `message`.
        if payload.order_ids.is_empty() {
            return Err(ReconciliationError::InvalidPayload(
                payload
                    .message
                    .unwrap_or_else(|| "confirmation carries no order ids".to_string()),
            ));
        }
        let total_amount = money(payload.total_amount, "total_amount")?;
        let order_ids = payload.order_ids.into_iter().map(OrderId::from).collect();
        let items = payload
            .items
            .into_iter()
            .map(ConfirmedItem::try_from)
            .collect::<Result<Vec<_>>>()?;

        let mut confirmation = OrderConfirmation::new(total_amount, order_ids)?.with_items(items);

        if let Some(status) = payload.status {
            confirmation = confirmation.with_status(status);
        }

        // The date is informational; an unreadable one must not fail an order
        // that was already created.
        if let Some(raw) = payload.delivery_date.as_deref() {
            match parse_delivery_date(raw) {
                Some(date) => confirmation = confirmation.with_delivery_date(date),
                None => tracing::warn!(delivery_date = raw, "ignoring unparseable delivery date"),
            }
        }

        Ok(confirmation)
    }
}
