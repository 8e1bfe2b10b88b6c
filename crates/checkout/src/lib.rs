//! Post-checkout order reconciliation.
//!
//! After the payment provider redirects the shopper back with a session
//! token, the confirmation view turns that token into a confirmed order:
//!
//! 1. Resolve the token from the route's query parameters
//! 2. Redirect home when there is none
//! 3. Otherwise call the order reconciliation backend exactly once per mount
//! 4. On success publish the order, then clear the cart
//! 5. On failure publish a recoverable error and leave the cart alone
//!
//! Results that arrive after the view has been unmounted are discarded.

pub mod client;
pub mod confirmation;
pub mod error;
pub mod navigation;
pub mod session;
pub mod state;
pub mod view;

pub use client::{HttpReconciliationClient, InMemoryReconciliationClient, OrderReconciliationClient};
pub use confirmation::{ConfirmedItem, OrderConfirmation, OrderConfirmationPayload};
pub use error::ReconciliationError;
pub use navigation::{InMemoryNavigator, Navigator, Route};
pub use session::PaymentSession;
pub use state::{ReconciliationState, StatusTag};
pub use view::{ConfirmationDeps, ConfirmationView, RenderedStatus, StateWatch};
