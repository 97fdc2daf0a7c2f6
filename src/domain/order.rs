use super::cart::{CartId, CartItem};
use crate::error::RemoteError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The order object returned by the place-order operation.
///
/// Backends report the confirmed order under either `order_number` or the
/// legacy `order_id` field; both shapes are accepted. Payloads carrying both
/// prefer a non-empty `order_number`. Anything else deserializes to
/// `Unrecognized`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlacedOrder {
    Dual { order_number: String, order_id: String },
    Current { order_number: String },
    Legacy { order_id: String },
    Unrecognized {},
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaceOrderResult {
    #[serde(default)]
    pub order: Option<PlacedOrder>,
}

impl PlaceOrderResult {
    pub fn with_order_number(order_number: impl Into<String>) -> Self {
        Self {
            order: Some(PlacedOrder::Current {
                order_number: order_number.into(),
            }),
        }
    }

    /// The confirmed order number, if the result carries a non-empty one.
    pub fn order_number(&self) -> Option<&str> {
        let number = match self.order.as_ref()? {
            PlacedOrder::Dual {
                order_number,
                order_id,
            } => {
                if order_number.is_empty() {
                    order_id
                } else {
                    order_number
                }
            }
            PlacedOrder::Current { order_number } => order_number,
            PlacedOrder::Legacy { order_id } => order_id,
            PlacedOrder::Unrecognized {} => return None,
        };
        (!number.is_empty()).then_some(number.as_str())
    }
}

/// Typed failure of a placement attempt, shown to the shopper.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct CheckoutError {
    pub message: String,
    #[source]
    pub cause: RemoteError,
}

impl CheckoutError {
    pub fn new(cause: RemoteError) -> Self {
        let message = match &cause {
            RemoteError::GraphQl(message) => message.clone(),
            RemoteError::Network(_) | RemoteError::Status(_) => {
                "A network error occurred while placing the order.".to_string()
            }
            RemoteError::Challenge(_) => {
                "Unable to verify the request. Please try again.".to_string()
            }
        };
        Self { message, cause }
    }
}

/// Flags of one attempt to place an order.
///
/// Owned by the checkout session and changed only through the transitions
/// below; the presentation layer reads a copy through the session view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPlacementRequest {
    button_clicked: bool,
    is_placing_order: bool,
    order_details_loading: bool,
    place_order_loading: bool,
    cart_id: Option<CartId>,
}

impl OrderPlacementRequest {
    pub fn button_clicked(&self) -> bool {
        self.button_clicked
    }

    pub fn is_placing_order(&self) -> bool {
        self.is_placing_order
    }

    pub fn order_details_loading(&self) -> bool {
        self.order_details_loading
    }

    pub fn place_order_loading(&self) -> bool {
        self.place_order_loading
    }

    /// Cart the accepted attempt was made against.
    pub fn cart_id(&self) -> Option<&CartId> {
        self.cart_id.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.is_placing_order || self.order_details_loading || self.place_order_loading
    }

    /// Starts the order-details fetch. Returns false while another attempt is busy.
    pub fn begin_details_fetch(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.order_details_loading = true;
        true
    }

    pub fn finish_details_fetch(&mut self) {
        self.order_details_loading = false;
    }

    pub fn accept(&mut self, cart_id: CartId) {
        self.button_clicked = true;
        self.is_placing_order = true;
        self.cart_id = Some(cart_id);
    }

    pub fn begin_place_order(&mut self) {
        self.place_order_loading = true;
    }

    pub fn finish_place_order(&mut self) {
        self.place_order_loading = false;
    }

    /// The attempt failed: the shopper may try again.
    pub fn fail(&mut self) {
        self.button_clicked = false;
        self.is_placing_order = false;
        self.place_order_loading = false;
    }

    /// The asynchronous chain finished or was cancelled.
    pub fn settle(&mut self) {
        self.is_placing_order = false;
        self.order_details_loading = false;
        self.place_order_loading = false;
    }

    pub fn clear_after_confirmation(&mut self) {
        *self = Self::default();
    }
}

/// Where the shopper is sent once an order number is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum NavigationTarget {
    OrderConfirmation {
        route: String,
        order_number: String,
        items: Vec<CartItem>,
    },
    CheckoutEntry {
        route: String,
    },
}

impl NavigationTarget {
    pub fn route(&self) -> &str {
        match self {
            NavigationTarget::OrderConfirmation { route, .. } => route,
            NavigationTarget::CheckoutEntry { route } => route,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_current_shape() {
        let result: PlaceOrderResult =
            serde_json::from_str(r#"{"order": {"order_number": "000000123"}}"#).unwrap();
        assert_eq!(result.order_number(), Some("000000123"));
    }

    #[test]
    fn test_order_number_legacy_shape() {
        let result: PlaceOrderResult =
            serde_json::from_str(r#"{"order": {"order_id": "000000042"}}"#).unwrap();
        assert_eq!(result.order_number(), Some("000000042"));
    }

    #[test]
    fn test_order_number_falls_back_to_order_id() {
        let result: PlaceOrderResult =
            serde_json::from_str(r#"{"order": {"order_number": "", "order_id": "42"}}"#).unwrap();
        assert_eq!(result.order_number(), Some("42"));

        let both: PlaceOrderResult = serde_json::from_str(
            r#"{"order": {"order_number": "000000123", "order_id": "42"}}"#,
        )
        .unwrap();
        assert_eq!(both.order_number(), Some("000000123"));

        let empty: PlaceOrderResult =
            serde_json::from_str(r#"{"order": {"order_number": ""}}"#).unwrap();
        assert_eq!(empty.order_number(), None);
    }

    #[test]
    fn test_order_number_absent() {
        let empty: PlaceOrderResult = serde_json::from_str(r#"{"order": {}}"#).unwrap();
        assert_eq!(empty.order, Some(PlacedOrder::Unrecognized {}));
        assert_eq!(empty.order_number(), None);

        let missing: PlaceOrderResult = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.order_number(), None);

        assert_eq!(PlaceOrderResult::with_order_number("").order_number(), None);
    }

    #[test]
    fn test_checkout_error_messages() {
        let graphql = CheckoutError::new(RemoteError::GraphQl("Card declined".to_string()));
        assert_eq!(graphql.to_string(), "Card declined");

        let network = CheckoutError::new(RemoteError::Network("timeout".to_string()));
        assert!(network.message.contains("network error"));
        assert_eq!(network.cause, RemoteError::Network("timeout".to_string()));
    }

    #[test]
    fn test_placement_guard() {
        let mut request = OrderPlacementRequest::default();
        assert!(request.begin_details_fetch());
        assert!(!request.begin_details_fetch());

        request.finish_details_fetch();
        request.accept(CartId::new("cart-1"));
        assert!(request.button_clicked());
        assert!(request.is_placing_order());
        assert!(!request.begin_details_fetch());

        request.fail();
        assert!(!request.button_clicked());
        assert!(!request.is_placing_order());
        assert!(request.begin_details_fetch());
    }

    #[test]
    fn test_settle_keeps_button_state() {
        let mut request = OrderPlacementRequest::default();
        request.accept(CartId::new("cart-1"));
        request.begin_place_order();
        request.settle();

        assert!(request.button_clicked());
        assert!(!request.is_busy());
        assert_eq!(request.cart_id(), Some(&CartId::new("cart-1")));
    }
}
