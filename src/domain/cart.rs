use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to the shopper's in-progress cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(String);

impl CartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A monetary value in a given currency.
///
/// Wraps `rust_decimal::Decimal` so prices never go through floating point.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Money {
    pub value: Decimal,
    pub currency: String,
}

impl Money {
    pub fn new(value: Decimal, currency: impl Into<String>) -> Self {
        Self {
            value,
            currency: currency.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub uid: String,
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartPrices {
    pub subtotal: Money,
    pub grand_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub carrier_code: String,
    pub method_code: String,
    pub carrier_title: String,
    pub method_title: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub firstname: String,
    pub lastname: String,
    pub city: String,
    pub country_code: String,
    #[serde(default)]
    pub selected_shipping_method: Option<ShippingMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub code: String,
    pub title: String,
}

/// Result of the subscribed checkout-details query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub items: Vec<CartItem>,
    pub available_payment_methods: Vec<PaymentMethod>,
    pub total_quantity: u32,
    pub prices: CartPrices,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
}

/// Cart contents as read by the no-cache order-details query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetailsCart {
    pub id: CartId,
    pub items: Vec<CartItem>,
    pub prices: CartPrices,
    #[serde(default)]
    pub shipping_addresses: Vec<ShippingAddress>,
    #[serde(default)]
    pub selected_payment_method: Option<PaymentMethod>,
}

impl OrderDetailsCart {
    /// Selected shipping method of every shipping address, in address order.
    pub fn selected_shipping_methods(&self) -> Vec<Option<ShippingMethod>> {
        self.shipping_addresses
            .iter()
            .map(|address| address.selected_shipping_method.clone())
            .collect()
    }
}

/// Point-in-time read of the cart taken right before placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderDetailsSnapshot {
    pub cart: Option<OrderDetailsCart>,
}

impl OrderDetailsSnapshot {
    pub fn is_populated(&self) -> bool {
        self.cart.is_some()
    }
}

/// Holds the last populated order-details snapshot.
///
/// Empty or still-loading results never replace a snapshot that is already
/// held; only a populated one supersedes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotSlot {
    current: Option<OrderDetailsSnapshot>,
}

impl SnapshotSlot {
    /// Offers a fetch result to the slot. Returns true if it was retained.
    pub fn offer(&mut self, result: Option<OrderDetailsSnapshot>) -> bool {
        match result {
            Some(snapshot) if snapshot.is_populated() => {
                self.current = Some(snapshot);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self) -> Option<&OrderDetailsSnapshot> {
        self.current.as_ref()
    }

    pub fn cart(&self) -> Option<&OrderDetailsCart> {
        self.current.as_ref().and_then(|snapshot| snapshot.cart.as_ref())
    }
}

/// Parses a comma separated list of payment method codes.
pub fn parse_method_codes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drops every payment method whose code is in `disabled`.
pub fn filter_payment_methods(methods: &[PaymentMethod], disabled: &[String]) -> Vec<PaymentMethod> {
    methods
        .iter()
        .filter(|method| !disabled.iter().any(|code| code == &method.code))
        .cloned()
        .collect()
}
