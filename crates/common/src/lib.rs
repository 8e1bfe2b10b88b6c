//! Shared value types for the storefront workspace.

mod types;

pub use types::{Money, MountId, OrderId};
