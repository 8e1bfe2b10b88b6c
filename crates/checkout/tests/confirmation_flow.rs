//! Integration tests for the order confirmation flow.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cart::{CartClearer, CartProduct, CartStore};
use checkout::state::{FAILURE_MESSAGE, SUCCESS_MESSAGE};
use checkout::{
    ConfirmationDeps, ConfirmationView, InMemoryNavigator, InMemoryReconciliationClient,
    OrderConfirmation, ReconciliationError, ReconciliationState, Route, StatusTag,
};
use common::{Money, OrderId};

/// Cart clearer that records what the view had published when it was called.
struct RecordingClearer {
    cart: CartStore,
    clears: AtomicUsize,
    observed: std::sync::Mutex<Vec<StatusTag>>,
    watch: std::sync::Mutex<Option<checkout::StateWatch>>,
}

impl RecordingClearer {
    fn new(cart: CartStore) -> Self {
        Self {
            cart,
            clears: AtomicUsize::new(0),
            observed: std::sync::Mutex::new(Vec::new()),
            watch: std::sync::Mutex::new(None),
        }
    }

    fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl CartClearer for RecordingClearer {
    fn clear(&self) {
        if let Some(watch) = self.watch.lock().unwrap().as_ref() {
            self.observed.lock().unwrap().push(watch.current().status());
        }
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.cart.clear();
    }
}

struct TestHarness {
    client: InMemoryReconciliationClient,
    cart: CartStore,
    clearer: Arc<RecordingClearer>,
    navigator: InMemoryNavigator,
}

impl TestHarness {
    fn new() -> Self {
        let cart = CartStore::new();
        cart.add(
            CartProduct::new("SKU-001", "Widget", Money::from_cents(4999), 10),
            2,
        )
        .unwrap();
        cart.add(
            CartProduct::new("SKU-002", "Gadget", Money::from_cents(3001), 3),
            1,
        )
        .unwrap();

        let client = InMemoryReconciliationClient::new();
        client.register_session(
            "sess_abc123",
            OrderConfirmation::new(
                Money::from_cents(12999),
                vec![OrderId::new("OC-1"), OrderId::new("OC-2")],
            )
            .unwrap(),
        );
        client.reject_session(
            "sess_bad",
            ReconciliationError::Rejected {
                status: 400,
                detail: "Payment not completed".to_string(),
            },
        );

        Self {
            clearer: Arc::new(RecordingClearer::new(cart.clone())),
            client,
            cart,
            navigator: InMemoryNavigator::new(),
        }
    }

    fn deps(&self) -> ConfirmationDeps {
        ConfirmationDeps::new(
            Arc::new(self.client.clone()),
            self.clearer.clone(),
            Arc::new(self.navigator.clone()),
        )
    }

    fn mount(&self, token: Option<&str>) -> ConfirmationView {
        let view = ConfirmationView::mount(token.map(|t| ("session_id", t)), self.deps());
        *self.clearer.watch.lock().unwrap() = Some(view.watch());
        view
    }

    async fn wait_for_calls(&self, calls: usize) {
        while self.client.call_count() < calls {
            tokio::task::yield_now().await;
        }
    }
}

#[tokio::test]
async fn test_confirmed_session_renders_orders_and_clears_cart() {
    let h = TestHarness::new();

    let view = h.mount(Some("sess_abc123"));
    let state = view.settled().await;

    assert!(matches!(state, ReconciliationState::Succeeded { .. }));
    let rendered = view.render();
    assert_eq!(rendered.status, StatusTag::Success);
    assert_eq!(rendered.message, SUCCESS_MESSAGE);
    assert!(!rendered.simulated);

    let order = rendered.order.unwrap();
    assert_eq!(order.total_amount().to_string(), "$129.99");
    assert_eq!(order.order_ids_display(), "OC-1, OC-2");

    assert!(h.cart.is_empty());
    assert_eq!(h.clearer.clears(), 1);
}

#[tokio::test]
async fn test_cart_is_cleared_after_success_is_published() {
    let h = TestHarness::new();

    let view = h.mount(Some("sess_abc123"));
    view.settled().await;

    assert_eq!(*h.clearer.observed.lock().unwrap(), vec![StatusTag::Success]);
}

#[tokio::test]
async fn test_simulated_session_is_flagged() {
    let h = TestHarness::new();

    let view = h.mount(Some("mock_session_xyz"));
    view.settled().await;

    let rendered = view.render();
    assert_eq!(rendered.status, StatusTag::Success);
    assert!(rendered.simulated);
    assert!(h.cart.is_empty());
}

#[tokio::test]
async fn test_rejected_session_keeps_cart_and_returns_to_cart() {
    let h = TestHarness::new();

    let view = h.mount(Some("sess_bad"));
    let state = view.settled().await;

    assert_eq!(state, ReconciliationState::failed());
    let rendered = view.render();
    assert_eq!(rendered.status, StatusTag::Error);
    assert_eq!(rendered.message, FAILURE_MESSAGE);
    assert!(rendered.order.is_none());
    assert!(!rendered.simulated);

    assert_eq!(h.clearer.clears(), 0);
    assert_eq!(h.cart.count(), 3);

    assert_eq!(view.dismiss(), Some(Route::Cart));
    assert_eq!(h.navigator.last(), Some(Route::Cart));
    assert_eq!(Route::Cart.path(), "/cart");
}

#[tokio::test]
async fn test_success_dismiss_continues_shopping() {
    let h = TestHarness::new();

    let view = h.mount(Some("sess_abc123"));
    view.settled().await;

    assert_eq!(view.dismiss(), Some(Route::Home));
    assert_eq!(h.navigator.history(), vec![Route::Home]);
}

#[tokio::test]
async fn test_missing_token_redirects_home_without_calling_backend() {
    let h = TestHarness::new();

    for query in [None, Some(""), Some("  ")] {
        let view = h.mount(query);
        tokio::task::yield_now().await;
        assert_eq!(view.state(), ReconciliationState::Idle);
    }

    assert_eq!(h.client.call_count(), 0);
    assert_eq!(h.navigator.history(), vec![Route::Home; 3]);
    assert_eq!(h.clearer.clears(), 0);
}

#[tokio::test]
async fn test_rerenders_while_processing_issue_one_call() {
    let h = TestHarness::new();
    h.client.hold_responses();

    let mut view = h.mount(Some("sess_abc123"));
    h.wait_for_calls(1).await;

    for _ in 0..10 {
        assert_eq!(view.render().status, StatusTag::Processing);
        view.update([("session_id", "sess_abc123")]);
        tokio::task::yield_now().await;
    }
    assert_eq!(h.client.call_count(), 1);
    assert_eq!(h.clearer.clears(), 0);

    h.client.release_responses();
    view.settled().await;
    for _ in 0..5 {
        view.render();
        tokio::task::yield_now().await;
    }

    assert_eq!(h.client.call_count(), 1);
    assert_eq!(h.clearer.clears(), 1);
}

#[tokio::test]
async fn test_reload_yields_same_orders_with_one_call_per_mount() {
    let h = TestHarness::new();

    let first = h.mount(Some("mock_session_reload"));
    let first_ids = first.settled().await.order().unwrap().order_ids().to_vec();
    first.unmount();

    let second = h.mount(Some("mock_session_reload"));
    let second_ids = second.settled().await.order().unwrap().order_ids().to_vec();

    assert_eq!(first_ids, second_ids);
    assert_eq!(h.client.calls_for("mock_session_reload"), 2);
}

#[tokio::test]
async fn test_unmount_while_in_flight_discards_result() {
    let h = TestHarness::new();
    h.client.hold_responses();

    let view = h.mount(Some("sess_abc123"));
    let watch = view.watch();
    h.wait_for_calls(1).await;

    view.unmount();
    h.client.release_responses();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(watch.current(), ReconciliationState::processing());
    assert_eq!(h.clearer.clears(), 0);
    assert_eq!(h.cart.count(), 3);
}

#[tokio::test]
async fn test_token_change_supersedes_previous_attempt() {
    let h = TestHarness::new();
    h.client.hold_responses();

    let mut view = h.mount(Some("sess_bad"));
    h.wait_for_calls(1).await;

    view.update([("session_id", "sess_abc123")]);
    assert_eq!(view.render().status, StatusTag::Processing);
    h.wait_for_calls(2).await;

    h.client.release_responses();
    let state = view.settled().await;

    assert!(matches!(state, ReconciliationState::Succeeded { .. }));
    assert_eq!(h.client.calls_for("sess_bad"), 1);
    assert_eq!(h.client.calls_for("sess_abc123"), 1);
    assert_eq!(h.clearer.clears(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_mounts_on_multi_thread_runtime() {
    let h = TestHarness::new();

    let views: Vec<_> = (0..8)
        .map(|i| {
            ConfirmationView::mount(
                [("session_id", format!("mock_session_{i}"))],
                h.deps(),
            )
        })
        .collect();

    for view in &views {
        assert_eq!(view.settled().await.status(), StatusTag::Success);
    }
    assert_eq!(h.client.call_count(), 8);
    assert!(h.cart.is_empty());
}
