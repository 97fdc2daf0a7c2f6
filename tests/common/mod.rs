#![allow(dead_code)]

use checkout_engine::application::session::CheckoutSession;
use checkout_engine::config::CheckoutConfig;
use checkout_engine::domain::cart::CartId;
use checkout_engine::domain::ports::SessionStore;
use checkout_engine::domain::step::CheckoutStep;
use checkout_engine::infrastructure::in_memory::{CartFixture, InMemoryBackend};

pub struct Harness {
    pub backend: InMemoryBackend,
    pub session: CheckoutSession,
    pub cart_id: CartId,
}

pub async fn harness(signed_in: bool) -> Harness {
    harness_with(CartFixture::default(), CheckoutConfig::default(), signed_in).await
}

pub async fn harness_with(fixture: CartFixture, config: CheckoutConfig, signed_in: bool) -> Harness {
    let backend = InMemoryBackend::seeded(fixture).await;
    let cart_id = backend
        .session_store
        .cart_id()
        .await
        .expect("seeded backend has a cart");
    let session = CheckoutSession::new(backend.collaborators(), config);
    session.set_signed_in(signed_in).await;
    Harness {
        backend,
        session,
        cart_id,
    }
}

pub fn fixture_with_order_number(order_number: &str) -> CartFixture {
    CartFixture {
        order_number: Some(order_number.to_string()),
        ..CartFixture::default()
    }
}

/// Walks the funnel from the shipping address step to review.
pub async fn advance_to_review(session: &CheckoutSession) {
    session.refresh().await;
    session.complete_shipping_address().await;
    session.complete_shipping_method().await;
    session.complete_payment().await;
    assert_eq!(session.view().await.step, CheckoutStep::Review);
}
