//! In-memory cart store.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use common::Money;
use serde::{Deserialize, Serialize};

use crate::error::{CartError, Result};

/// Upper bound on the quantity of a pre-order line, which has no stock to clamp to.
pub const PREORDER_MAX_QUANTITY: u32 = 99;

/// The only cart mutation the checkout confirmation flow may perform.
///
/// Implementations must be idempotent: clearing an empty cart is a no-op.
pub trait CartClearer: Send + Sync {
    /// Removes every line from the cart.
    fn clear(&self);
}

/// A catalog product as offered to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub product_id: String,
    pub name: String,
    /// Price currently in effect (sale price when one is active).
    pub price: Money,
    pub stock: u32,
    #[serde(default)]
    pub is_preorder: bool,
}

impl CartProduct {
    /// Creates a product with regular stock.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price,
            stock,
            is_preorder: false,
        }
    }

    /// Marks the product as a pre-order item.
    pub fn preorder(mut self) -> Self {
        self.is_preorder = true;
        self
    }

    fn max_quantity(&self) -> u32 {
        if self.is_preorder {
            PREORDER_MAX_QUANTITY
        } else {
            self.stock
        }
    }
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: CartProduct,
    pub quantity: u32,
}

impl CartItem {
    /// Returns the line total (quantity * effective price).
    pub fn line_total(&self) -> Money {
        self.product.price.multiply(self.quantity)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CartState {
    items: Vec<CartItem>,
}

impl CartState {
    fn line_mut(&mut self, product_id: &str) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|line| line.product.product_id == product_id)
    }

    /// Sum of all line totals, or `None` if it does not fit in [`Money`].
    ///
    /// `replacing` prices one line at a new quantity without committing it.
    fn checked_total(&self, replacing: Option<(&CartProduct, u32)>) -> Option<Money> {
        let mut total = Money::zero();
        let mut replaced = false;
        for line in &self.items {
            let quantity = match replacing {
                Some((product, quantity)) if product.product_id == line.product.product_id => {
                    replaced = true;
                    quantity
                }
                _ => line.quantity,
            };
            total = total.checked_add(line.product.price.checked_multiply(quantity)?)?;
        }
        match replacing {
            Some((product, quantity)) if !replaced => {
                total.checked_add(product.price.checked_multiply(quantity)?)
            }
            _ => Some(total),
        }
    }

    /// Fails unless the cart total stays representable with the given line.
    fn ensure_total_fits(&self, product: &CartProduct, quantity: u32) -> Result<()> {
        match self.checked_total(Some((product, quantity))) {
            Some(_) => Ok(()),
            None => Err(CartError::AmountOutOfRange(product.product_id.clone())),
        }
    }
}

/// Shared, cloneable handle to the shopper's cart.
///
/// Clones share the same underlying lines.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    state: Arc<RwLock<CartState>>,
}

impl CartStore {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CartState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CartState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a product, merging with an existing line and clamping to the
    /// available stock. Returns the resulting line quantity.
    ///
    /// A merged line takes the incoming product's price and stock. A product
    /// with no stock left ends up with no line and returns `0`. The cart is
    /// untouched when the resulting total would not be representable.
    pub fn add(&self, product: CartProduct, quantity: u32) -> Result<u32> {
        let mut state = self.write();
        let max = product.max_quantity();
        let existing = state
            .line_mut(&product.product_id)
            .map(|line| line.quantity)
            .unwrap_or(0);
        let next = existing.saturating_add(quantity).min(max);

        if next == 0 {
            tracing::debug!(product_id = %product.product_id, "product out of stock, not added");
            state
                .items
                .retain(|line| line.product.product_id != product.product_id);
            return Ok(0);
        }
        state.ensure_total_fits(&product, next)?;

        match state.line_mut(&product.product_id) {
            Some(line) => {
                line.product = product;
                line.quantity = next;
            }
            None => {
                tracing::debug!(product_id = %product.product_id, quantity = next, "cart line added");
                state.items.push(CartItem {
                    product,
                    quantity: next,
                });
            }
        }
        Ok(next)
    }

    /// Sets the quantity of an existing line.
    ///
    /// A quantity below one removes the line and returns `0`.
    pub fn update_quantity(&self, product_id: &str, quantity: u32) -> Result<u32> {
        if quantity < 1 {
            return if self.remove(product_id) {
                Ok(0)
            } else {
                Err(CartError::ProductNotInCart(product_id.to_string()))
            };
        }

        let mut state = self.write();
        let product = state
            .line_mut(product_id)
            .map(|line| line.product.clone())
            .ok_or_else(|| CartError::ProductNotInCart(product_id.to_string()))?;
        let quantity = quantity.min(product.max_quantity());
        if quantity == 0 {
            state.items.retain(|line| line.product.product_id != product_id);
            return Ok(0);
        }
        state.ensure_total_fits(&product, quantity)?;

        if let Some(line) = state.line_mut(product_id) {
            line.quantity = quantity;
        }
        Ok(quantity)
    }

    /// Removes a line. Returns true if the product was in the cart.
    pub fn remove(&self, product_id: &str) -> bool {
        let mut state = self.write();
        let before = state.items.len();
        state.items.retain(|line| line.product.product_id != product_id);
        state.items.len() != before
    }

    /// Returns a copy of the current lines.
    pub fn items(&self) -> Vec<CartItem> {
        self.read().items.clone()
    }

    /// Returns the sum of all line totals.
    pub fn total(&self) -> Money {
        self.read().items.iter().map(CartItem::line_total).sum()
    }

    /// Returns the number of units across all lines.
    pub fn count(&self) -> u32 {
        self.read()
            .items
            .iter()
            .fold(0, |count, line| count.saturating_add(line.quantity))
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    /// Serializes the cart for persistence between sessions.
    pub fn snapshot(&self) -> Result<String> {
        Ok(serde_json::to_string(&*self.read())?)
    }

    /// Restores a cart from a snapshot.
    ///
    /// Lines with no units are dropped; a snapshot whose total is not
    /// representable is rejected.
    pub fn try_restore(snapshot: &str) -> Result<Self> {
        let mut state: CartState = serde_json::from_str(snapshot)?;
        state.items.retain(|line| line.quantity > 0);
        if state.checked_total(None).is_none() {
            return Err(CartError::AmountOutOfRange(
                state
                    .items
                    .last()
                    .map(|line| line.product.product_id.clone())
                    .unwrap_or_default(),
            ));
        }
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Restores a cart from a snapshot, falling back to an empty cart when the
    /// snapshot is unreadable.
    pub fn restore(snapshot: &str) -> Self {
        match Self::try_restore(snapshot) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable cart snapshot");
                Self::new()
            }
        }
    }
}

impl CartClearer for CartStore {
    fn clear(&self) {
        let mut state = self.write();
        let lines = state.items.len();
        state.items.clear();
        metrics::counter!("cart_cleared_total").increment(1);
        tracing::info!(lines, "cart cleared");
    }
}
