use super::cart::{CartId, CartItem, CartPrices, OrderDetailsCart, PaymentMethod, ShippingMethod};
use super::order::OrderPlacementRequest;
use super::step::CheckoutStep;
use serde::Serialize;

/// Order data attached to the place-order and confirmation events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPayload {
    pub cart_id: CartId,
    pub amount: CartPrices,
    pub shipping: Vec<Option<ShippingMethod>>,
    pub payment: Option<PaymentMethod>,
    pub products: Vec<CartItem>,
}

impl OrderPayload {
    fn from_snapshot(cart_id: &CartId, cart: &OrderDetailsCart) -> Self {
        Self {
            cart_id: cart_id.clone(),
            amount: cart.prices.clone(),
            shipping: cart.selected_shipping_methods(),
            payment: cart.selected_payment_method.clone(),
            products: cart.items.clone(),
        }
    }
}

/// Lifecycle events fed to the analytics dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalyticsEvent {
    CheckoutPageView {
        cart_id: Option<CartId>,
        products: Vec<CartItem>,
    },
    CheckoutReviewButtonClicked {
        cart_id: Option<CartId>,
    },
    CheckoutPlaceOrderButtonClicked(OrderPayload),
    OrderConfirmationPageView {
        order_number: String,
        #[serde(flatten)]
        order: OrderPayload,
    },
}

impl AnalyticsEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AnalyticsEvent::CheckoutPageView { .. } => "CHECKOUT_PAGE_VIEW",
            AnalyticsEvent::CheckoutReviewButtonClicked { .. } => "CHECKOUT_REVIEW_BUTTON_CLICKED",
            AnalyticsEvent::CheckoutPlaceOrderButtonClicked(_) => {
                "CHECKOUT_PLACE_ORDER_BUTTON_CLICKED"
            }
            AnalyticsEvent::OrderConfirmationPageView { .. } => "ORDER_CONFIRMATION_PAGE_VIEW",
        }
    }
}

/// The slice of session state that analytics events are derived from.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub step: CheckoutStep,
    pub cart_id: Option<&'a CartId>,
    pub cart_items: &'a [CartItem],
    pub review_requested: bool,
    pub placement: &'a OrderPlacementRequest,
    pub snapshot: Option<&'a OrderDetailsCart>,
    pub order_number: Option<&'a str>,
}

/// Projects the current state onto at most one analytics event.
///
/// Rules are tried in a fixed order and only the first match fires: page
/// view, review click, then place-order click or order confirmation.
pub fn derive_event(ctx: &EventContext<'_>) -> Option<AnalyticsEvent> {
    if ctx.step == CheckoutStep::ShippingAddress && !ctx.cart_items.is_empty() {
        return Some(AnalyticsEvent::CheckoutPageView {
            cart_id: ctx.cart_id.cloned(),
            products: ctx.cart_items.to_vec(),
        });
    }

    if ctx.review_requested {
        return Some(AnalyticsEvent::CheckoutReviewButtonClicked {
            cart_id: ctx.cart_id.cloned(),
        });
    }

    let snapshot = ctx.snapshot?;
    if !ctx.placement.button_clicked() {
        return None;
    }
    // Place-order events describe the cart the attempt was made against.
    let cart_id = ctx.placement.cart_id().or(ctx.cart_id)?;
    let payload = OrderPayload::from_snapshot(cart_id, snapshot);

    if ctx.placement.is_placing_order() {
        return Some(AnalyticsEvent::CheckoutPlaceOrderButtonClicked(payload));
    }

    match ctx.order_number {
        Some(order_number) if &snapshot.id == cart_id => {
            Some(AnalyticsEvent::OrderConfirmationPageView {
                order_number: order_number.to_string(),
                order: payload,
            })
        }
        _ => None,
    }
}
