use super::cart::{CartId, CheckoutDetails, Customer, OrderDetailsSnapshot};
use super::events::AnalyticsEvent;
use super::order::{NavigationTarget, PlaceOrderResult};
use crate::error::RemoteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Proof-of-humanity data merged into the place-order call as request headers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChallengeToken {
    pub headers: BTreeMap<String, String>,
}

impl ChallengeToken {
    pub fn recaptcha(token: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("X-ReCaptcha".to_string(), token.into());
        Self { headers }
    }
}

/// Named operations of the remote commerce backend.
#[async_trait]
pub trait CommerceClient: Send + Sync {
    async fn fetch_checkout_details(&self, cart_id: &CartId) -> RemoteResult<CheckoutDetails>;
    async fn fetch_customer(&self) -> RemoteResult<Customer>;
    /// Always bypasses the result cache.
    async fn fetch_order_details(&self, cart_id: &CartId)
    -> RemoteResult<Option<OrderDetailsSnapshot>>;
    async fn create_cart(&self) -> RemoteResult<CartId>;
    async fn place_order(
        &self,
        cart_id: &CartId,
        token: &ChallengeToken,
    ) -> RemoteResult<PlaceOrderResult>;
    /// Evicts the cached `cart` sub-tree and garbage-collects what it referenced.
    async fn evict_cart_cache(&self) -> RemoteResult<()>;
    /// Drops every cached result.
    async fn reset_cache(&self) -> RemoteResult<()>;
}

/// Holder of the active cart identifier.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn cart_id(&self) -> Option<CartId>;
    /// Creates a cart through `client` and makes it the active one.
    async fn create_cart(&self, client: &dyn CommerceClient) -> RemoteResult<CartId>;
    async fn remove_cart(&self) -> RemoteResult<()>;
}

#[async_trait]
pub trait ChallengeTokenProvider: Send + Sync {
    async fn generate_challenge_data(&self) -> RemoteResult<ChallengeToken>;
}

#[async_trait]
pub trait AnalyticsDispatcher: Send + Sync {
    async fn dispatch(&self, event: AnalyticsEvent);
}

#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, target: NavigationTarget);
}

/// Local key/value markers that outlive a single checkout attempt.
#[async_trait]
pub trait MarkerStore: Send + Sync {
    async fn set_marker(&self, key: &str, value: &str) -> std::io::Result<()>;
}

pub type CommerceClientRef = Arc<dyn CommerceClient>;
pub type SessionStoreRef = Arc<dyn SessionStore>;
pub type ChallengeTokenProviderRef = Arc<dyn ChallengeTokenProvider>;
pub type AnalyticsDispatcherRef = Arc<dyn AnalyticsDispatcher>;
pub type NavigatorRef = Arc<dyn Navigator>;
pub type MarkerStoreRef = Arc<dyn MarkerStore>;

/// The collaborators a checkout session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub commerce: CommerceClientRef,
    pub session_store: SessionStoreRef,
    pub challenge: ChallengeTokenProviderRef,
    pub analytics: AnalyticsDispatcherRef,
    pub navigator: NavigatorRef,
    pub markers: MarkerStoreRef,
}
