//! HTTP route handlers.

pub mod cart;
pub mod confirmation;
pub mod health;
pub mod metrics;
