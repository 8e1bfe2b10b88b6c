//! Shopper cart for the storefront.
//!
//! The cart is a single owned store. Other parts of the client get either the
//! whole [`CartStore`] (catalog and cart screens) or only the [`CartClearer`]
//! capability (the checkout confirmation flow), never the internal line list.

pub mod error;
pub mod store;

pub use error::CartError;
pub use store::{CartClearer, CartItem, CartProduct, CartStore, PREORDER_MAX_QUANTITY};
