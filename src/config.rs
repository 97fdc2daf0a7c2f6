use crate::domain::cart::parse_method_codes;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings of a checkout session.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Payment method codes hidden from the presentation layer.
    pub disabled_payment_methods: Vec<String>,
    pub confirmation_route: String,
    pub checkout_route: String,
    /// Marker written once an order has been requested in this session.
    pub order_marker_key: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            disabled_payment_methods: Vec::new(),
            confirmation_route: "/order-confirmation".to_string(),
            checkout_route: "/checkout".to_string(),
            order_marker_key: "orderCount".to_string(),
        }
    }
}

impl CheckoutConfig {
    /// Loads a JSON config file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            EngineError::ConfigError(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Replaces the disabled payment methods with a comma separated list.
    pub fn with_disabled_payments(mut self, raw: &str) -> Self {
        self.disabled_payment_methods = parse_method_codes(raw);
        self
    }
}
