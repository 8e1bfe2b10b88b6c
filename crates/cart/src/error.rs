//! Cart error types.

use thiserror::Error;

/// Errors that can occur while changing, persisting or restoring a cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// The snapshot could not be encoded or decoded.
    #[error("Cart snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// No line exists for the given product.
    #[error("Product not in cart: {0}")]
    ProductNotInCart(String),

    /// The change would push a line or cart total past the representable amount.
    #[error("Cart total out of range for product: {0}")]
    AmountOutOfRange(String),
}

/// Convenience type alias for cart results.
pub type Result<T> = std::result::Result<T, CartError>;
