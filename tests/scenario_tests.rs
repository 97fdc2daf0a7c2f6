mod common;

use checkout_engine::application::session::{IgnoreReason, IntentOutcome};
use checkout_engine::domain::events::AnalyticsEvent;
use checkout_engine::domain::order::NavigationTarget;
use checkout_engine::domain::ports::SessionStore;
use checkout_engine::domain::step::CheckoutStep;
use checkout_engine::error::RemoteError;
use checkout_engine::infrastructure::in_memory::{CartFixture, RemoteOperation};
use common::{advance_to_review, fixture_with_order_number, harness, harness_with};

#[tokio::test]
async fn test_page_view_for_cart_with_items() {
    let h = harness(false).await;

    h.session.refresh().await;

    let events = h.backend.journal.events().await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        AnalyticsEvent::CheckoutPageView { cart_id, products } => {
            assert_eq!(cart_id.as_ref(), Some(&h.cart_id));
            assert_eq!(products.len(), 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(h.session.view().await.step, CheckoutStep::ShippingAddress);
}

#[tokio::test]
async fn test_signed_in_order_confirmation() {
    let h = harness_with(
        fixture_with_order_number("000000123"),
        Default::default(),
        true,
    )
    .await;
    advance_to_review(&h.session).await;

    assert_eq!(h.session.place_order_intent().await, IntentOutcome::Accepted);
    h.session.wait_for_placement().await;

    let store = &h.backend.session_store;
    assert_eq!(store.removed_carts().await, vec![h.cart_id.clone()]);
    let created = store.created_carts().await;
    assert_eq!(created.len(), 1);
    assert_eq!(store.cart_id().await, Some(created[0].clone()));

    let view = h.session.view().await;
    assert_eq!(view.step, CheckoutStep::ShippingAddress);
    assert_eq!(view.order_number.as_deref(), Some("000000123"));
    assert!(!view.place_order_button_clicked);
    assert!(!view.is_placing_order);

    let navigations = h.backend.journal.navigations().await;
    assert_eq!(
        navigations,
        vec![NavigationTarget::OrderConfirmation {
            route: "/order-confirmation".to_string(),
            order_number: "000000123".to_string(),
            items: CartFixture::default().items,
        }]
    );

    assert_eq!(
        h.backend.journal.event_types().await,
        vec![
            "CHECKOUT_PAGE_VIEW",
            "CHECKOUT_PLACE_ORDER_BUTTON_CLICKED",
            "ORDER_CONFIRMATION_PAGE_VIEW",
        ]
    );
}

#[tokio::test]
async fn test_guest_returns_to_checkout_entry() {
    let h = harness_with(
        fixture_with_order_number("000000123"),
        Default::default(),
        false,
    )
    .await;
    advance_to_review(&h.session).await;

    h.session.place_order_intent().await;
    h.session.wait_for_placement().await;

    assert_eq!(
        h.backend.journal.navigations().await,
        vec![NavigationTarget::CheckoutEntry {
            route: "/checkout".to_string(),
        }]
    );
    assert_eq!(h.session.view().await.step, CheckoutStep::ShippingAddress);
}

#[tokio::test]
async fn test_place_order_network_failure() {
    let h = harness(true).await;
    advance_to_review(&h.session).await;
    let network_error = RemoteError::Network("connection reset".to_string());
    h.backend
        .commerce
        .fail(RemoteOperation::PlaceOrder, network_error.clone())
        .await;

    assert_eq!(h.session.place_order_intent().await, IntentOutcome::Accepted);
    h.session.wait_for_placement().await;

    let view = h.session.view().await;
    assert!(!view.place_order_button_clicked);
    assert!(!view.is_placing_order);
    assert!(view.has_error());
    assert_eq!(view.error.unwrap().cause, network_error);
    assert_eq!(view.step, CheckoutStep::Review);

    assert_eq!(h.backend.session_store.cart_id().await, Some(h.cart_id.clone()));
    assert!(h.backend.session_store.removed_carts().await.is_empty());
    assert!(h.backend.journal.navigations().await.is_empty());
}

#[tokio::test]
async fn test_second_intent_while_placing_is_ignored() {
    let h = harness(true).await;
    advance_to_review(&h.session).await;
    let gate = h.backend.commerce.hold_place_order().await;

    assert_eq!(h.session.place_order_intent().await, IntentOutcome::Accepted);
    assert_eq!(
        h.session.place_order_intent().await,
        IntentOutcome::Ignored(IgnoreReason::InFlight)
    );

    gate.notify_one();
    h.session.wait_for_placement().await;

    let commerce = &h.backend.commerce;
    assert_eq!(commerce.call_count(RemoteOperation::FetchOrderDetails).await, 1);
    assert_eq!(commerce.call_count(RemoteOperation::PlaceOrder).await, 1);
    assert_eq!(h.backend.journal.navigations().await.len(), 1);
}
