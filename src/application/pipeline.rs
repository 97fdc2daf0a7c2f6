//! The order placement pipeline.
//!
//! Runs as a background task once a place-order intent is accepted:
//! challenge token, place-order call, then cart cleanup (remove the consumed
//! cart, evict the cached cart, create a fresh cart) and the
//! post-confirmation reset. Every continuation checks the session's
//! liveness flag after each suspension point, and again under the state
//! lock before mutating anything.

use super::session::SessionInner;
use crate::domain::cart::CartId;
use crate::domain::order::{CheckoutError, NavigationTarget, PlaceOrderResult};
use crate::error::RemoteError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// Cancellation flag shared by a session and its pipeline task.
#[derive(Debug)]
pub struct Liveness(AtomicBool);

impl Default for Liveness {
    fn default() -> Self {
        Self(AtomicBool::new(true))
    }
}

impl Liveness {
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn end(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Result of the post-success cleanup.
#[derive(Debug, Default)]
struct CleanupReport {
    new_cart: Option<CartId>,
    warnings: Vec<String>,
}

pub(crate) async fn run(inner: Arc<SessionInner>, cart_id: CartId) {
    if !inner.liveness.is_alive() {
        return;
    }

    let challenge = inner.collaborators.challenge.generate_challenge_data().await;
    if !inner.liveness.is_alive() {
        debug!(%cart_id, "session ended while generating the challenge token");
        return;
    }
    let token = match challenge {
        Ok(token) => token,
        Err(cause) => return fail(&inner, cause).await,
    };

    {
        let mut state = inner.state.lock().await;
        if !inner.liveness.is_alive() {
            return;
        }
        state.placement.begin_place_order();
        state.error = None;
    }

    let placed = inner.collaborators.commerce.place_order(&cart_id, &token).await;
    if !inner.liveness.is_alive() {
        debug!(%cart_id, "session ended while placing order, discarding result");
        return;
    }
    let result = match placed {
        Ok(result) => result,
        Err(cause) => return fail(&inner, cause).await,
    };

    {
        let mut state = inner.state.lock().await;
        if !inner.liveness.is_alive() {
            return;
        }
        state.placement.finish_place_order();
        state.place_order_result = Some(result.clone());
    }

    let Some(report) = cleanup(&inner).await else {
        debug!(%cart_id, "session ended during cart cleanup");
        return;
    };

    let event = {
        let mut state = inner.state.lock().await;
        if !inner.liveness.is_alive() {
            return;
        }
        state.placement.settle();
        state.cleanup_warnings = report.warnings;
        state.track_cart(report.new_cart);
        state.derive_event()
    };
    inner.publish(event).await;

    confirm(&inner, &result).await;
}

async fn fail(inner: &SessionInner, cause: RemoteError) {
    error!(error = %cause, "An error occurred when placing the order");
    let event = {
        let mut state = inner.state.lock().await;
        if !inner.liveness.is_alive() {
            return;
        }
        state.placement.fail();
        state.placement.settle();
        state.error = Some(CheckoutError::new(cause));
        state.derive_event()
    };
    inner.publish(event).await;
}

/// Retires the consumed cart. Failures are logged and reported as warnings;
/// the order itself is already final. Returns `None` if the session ended.
async fn cleanup(inner: &SessionInner) -> Option<CleanupReport> {
    let collaborators = &inner.collaborators;
    let mut report = CleanupReport::default();

    if let Err(error) = collaborators.session_store.remove_cart().await {
        warn!(%error, "failed to remove the ordered cart");
        report.warnings.push(format!("cart removal failed: {error}"));
    }
    if !inner.liveness.is_alive() {
        return None;
    }

    if let Err(error) = collaborators.commerce.evict_cart_cache().await {
        warn!(%error, "cart cache eviction failed, resetting the whole cache");
        if let Err(error) = collaborators.commerce.reset_cache().await {
            warn!(%error, "cache reset failed");
            report.warnings.push(format!("cache reset failed: {error}"));
        }
    }
    if !inner.liveness.is_alive() {
        return None;
    }

    match collaborators
        .session_store
        .create_cart(collaborators.commerce.as_ref())
        .await
    {
        Ok(cart_id) => report.new_cart = Some(cart_id),
        Err(error) => {
            warn!(%error, "failed to create a fresh cart");
            report.warnings.push(format!("cart creation failed: {error}"));
        }
    }
    if !inner.liveness.is_alive() {
        return None;
    }

    Some(report)
}

/// Resets the funnel and sends the shopper on once an order number is known.
async fn confirm(inner: &SessionInner, result: &PlaceOrderResult) {
    let Some(order_number) = result.order_number() else {
        warn!("place order completed without an order number payload");
        return;
    };

    let (target, event) = {
        let mut state = inner.state.lock().await;
        if !inner.liveness.is_alive() {
            return;
        }
        let items = state
            .snapshot
            .cart()
            .map(|cart| cart.items.clone())
            .unwrap_or_else(|| state.cart_items().to_vec());

        state.placement.clear_after_confirmation();
        state.machine.reset_after_confirmation();

        let target = if state.signed_in {
            NavigationTarget::OrderConfirmation {
                route: inner.config.confirmation_route.clone(),
                order_number: order_number.to_string(),
                items,
            }
        } else {
            NavigationTarget::CheckoutEntry {
                route: inner.config.checkout_route.clone(),
            }
        };
        (target, state.derive_event())
    };

    info!(order_number, route = target.route(), "order confirmed");
    inner.publish(event).await;
    inner.collaborators.navigator.navigate(target).await;
}
