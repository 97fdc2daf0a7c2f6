use crate::domain::cart::{
    CartId, CartItem, CartPrices, CheckoutDetails, Customer, Money, OrderDetailsCart,
    OrderDetailsSnapshot, PaymentMethod, ShippingAddress, ShippingMethod,
};
use crate::domain::events::AnalyticsEvent;
use crate::domain::order::{NavigationTarget, PlaceOrderResult};
use crate::domain::ports::{
    AnalyticsDispatcher, ChallengeToken, ChallengeTokenProvider, Collaborators, CommerceClient,
    MarkerStore, Navigator, RemoteResult, SessionStore,
};
use crate::error::{EngineError, RemoteError, Result};
use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

/// Contents of the cart the in-memory backend starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartFixture {
    pub items: Vec<CartItem>,
    pub prices: CartPrices,
    pub shipping_addresses: Vec<ShippingAddress>,
    pub selected_payment_method: Option<PaymentMethod>,
    pub available_payment_methods: Vec<PaymentMethod>,
    pub customer: Customer,
    /// Order number returned by the next successful placement.
    pub order_number: Option<String>,
}

impl Default for CartFixture {
    fn default() -> Self {
        let usd = |value| Money::new(value, "USD");
        Self {
            items: vec![
                CartItem {
                    uid: "MQ==".to_string(),
                    sku: "VT01".to_string(),
                    name: "Silver Amor Bangle Set".to_string(),
                    quantity: 1,
                    price: usd(dec!(98.00)),
                },
                CartItem {
                    uid: "Mg==".to_string(),
                    sku: "VA22-SI-NA".to_string(),
                    name: "Carina Cardigan".to_string(),
                    quantity: 2,
                    price: usd(dec!(64.00)),
                },
            ],
            prices: CartPrices {
                subtotal: usd(dec!(226.00)),
                grand_total: usd(dec!(236.00)),
            },
            shipping_addresses: vec![ShippingAddress {
                firstname: "Veronica".to_string(),
                lastname: "Costello".to_string(),
                city: "Calder".to_string(),
                country_code: "US".to_string(),
                selected_shipping_method: Some(ShippingMethod {
                    carrier_code: "flatrate".to_string(),
                    method_code: "flatrate".to_string(),
                    carrier_title: "Flat Rate".to_string(),
                    method_title: "Fixed".to_string(),
                    amount: usd(dec!(10.00)),
                }),
            }],
            selected_payment_method: Some(PaymentMethod {
                code: "checkmo".to_string(),
                title: "Check / Money order".to_string(),
            }),
            available_payment_methods: vec![
                PaymentMethod {
                    code: "checkmo".to_string(),
                    title: "Check / Money order".to_string(),
                },
                PaymentMethod {
                    code: "banktransfer".to_string(),
                    title: "Bank Transfer Payment".to_string(),
                },
            ],
            customer: Customer {
                email: "roni_cost@example.com".to_string(),
                firstname: "Veronica".to_string(),
                lastname: "Costello".to_string(),
            },
            order_number: None,
        }
    }
}

impl CartFixture {
    /// Loads a fixture from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(EngineError::from)
    }

    fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Operations of the in-memory commerce backend, used to inject failures and
/// inspect call history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    FetchCheckoutDetails,
    FetchCustomer,
    FetchOrderDetails,
    CreateCart,
    PlaceOrder,
    EvictCartCache,
    ResetCache,
}

#[derive(Debug)]
struct CartRecord {
    /// Only the seeded cart holds the fixture items; created carts start empty.
    seeded: bool,
    active: bool,
}

#[derive(Default)]
struct CommerceState {
    fixture: CartFixture,
    carts: HashMap<CartId, CartRecord>,
    next_cart: u32,
    next_order: u32,
    order_result: Option<PlaceOrderResult>,
    failures: HashMap<RemoteOperation, RemoteError>,
    calls: Vec<RemoteOperation>,
    tokens: Vec<ChallengeToken>,
    cache: HashSet<String>,
    place_order_gate: Option<Arc<Notify>>,
    blank_order_details: bool,
}

impl CommerceState {
    fn record(&mut self, operation: RemoteOperation) -> RemoteResult<()> {
        self.calls.push(operation);
        match self.failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn active_cart(&self, cart_id: &CartId) -> RemoteResult<&CartRecord> {
        match self.carts.get(cart_id) {
            Some(record) if record.active => Ok(record),
            Some(_) => Err(RemoteError::GraphQl("The cart isn't active.".to_string())),
            None => Err(RemoteError::GraphQl(format!(
                "Could not find a cart with ID \"{cart_id}\""
            ))),
        }
    }

    fn new_cart(&mut self, seeded: bool) -> CartId {
        self.next_cart += 1;
        let cart_id = CartId::new(format!("cart-{}", self.next_cart));
        self.carts.insert(cart_id.clone(), CartRecord { seeded, active: true });
        cart_id
    }
}

/// A scriptable in-memory commerce backend.
///
/// Keeps a result cache keyed by field name so cache eviction can be
/// observed, records every call, and can be told to fail any operation.
#[derive(Default, Clone)]
pub struct InMemoryCommerceClient {
    state: Arc<RwLock<CommerceState>>,
}

impl InMemoryCommerceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixture(fixture: CartFixture) -> Self {
        let state = CommerceState {
            fixture,
            ..CommerceState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Creates a cart holding the fixture items.
    pub async fn seed_cart(&self) -> CartId {
        self.state.write().await.new_cart(true)
    }

    /// Makes every call to `operation` fail with `error` until recovered.
    pub async fn fail(&self, operation: RemoteOperation, error: RemoteError) {
        self.state.write().await.failures.insert(operation, error);
    }

    pub async fn recover(&self, operation: RemoteOperation) {
        self.state.write().await.failures.remove(&operation);
    }

    /// Overrides the result of the next placements.
    pub async fn respond_to_place_order(&self, result: PlaceOrderResult) {
        self.state.write().await.order_result = Some(result);
    }

    /// Makes the order-details query answer with no data at all.
    pub async fn blank_order_details(&self, blank: bool) {
        self.state.write().await.blank_order_details = blank;
    }

    /// Holds every place-order call until the returned gate is notified.
    pub async fn hold_place_order(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.write().await.place_order_gate = Some(Arc::clone(&gate));
        gate
    }

    pub async fn calls(&self) -> Vec<RemoteOperation> {
        self.state.read().await.calls.clone()
    }

    pub async fn call_count(&self, operation: RemoteOperation) -> usize {
        let state = self.state.read().await;
        state.calls.iter().filter(|call| **call == operation).count()
    }

    pub async fn tokens(&self) -> Vec<ChallengeToken> {
        self.state.read().await.tokens.clone()
    }

    pub async fn is_cached(&self, field: &str) -> bool {
        self.state.read().await.cache.contains(field)
    }

    pub async fn is_cart_active(&self, cart_id: &CartId) -> bool {
        let state = self.state.read().await;
        state.carts.get(cart_id).is_some_and(|record| record.active)
    }
}

#[async_trait]
impl CommerceClient for InMemoryCommerceClient {
    async fn fetch_checkout_details(&self, cart_id: &CartId) -> RemoteResult<CheckoutDetails> {
        let mut state = self.state.write().await;
        state.record(RemoteOperation::FetchCheckoutDetails)?;
        let seeded = state.active_cart(cart_id)?.seeded;
        state.cache.insert("cart".to_string());

        let fixture = &state.fixture;
        if !seeded {
            return Ok(CheckoutDetails {
                available_payment_methods: fixture.available_payment_methods.clone(),
                ..CheckoutDetails::default()
            });
        }
        Ok(CheckoutDetails {
            items: fixture.items.clone(),
            available_payment_methods: fixture.available_payment_methods.clone(),
            total_quantity: fixture.total_quantity(),
            prices: fixture.prices.clone(),
        })
    }

    async fn fetch_customer(&self) -> RemoteResult<Customer> {
        let mut state = self.state.write().await;
        state.record(RemoteOperation::FetchCustomer)?;
        state.cache.insert("customer".to_string());
        Ok(state.fixture.customer.clone())
    }

    async fn fetch_order_details(
        &self,
        cart_id: &CartId,
    ) -> RemoteResult<Option<OrderDetailsSnapshot>> {
        let mut state = self.state.write().await;
        state.record(RemoteOperation::FetchOrderDetails)?;
        if state.blank_order_details {
            return Ok(None);
        }
        if !state.active_cart(cart_id)?.seeded {
            return Ok(Some(OrderDetailsSnapshot::default()));
        }
        let fixture = &state.fixture;
        Ok(Some(OrderDetailsSnapshot {
            cart: Some(OrderDetailsCart {
                id: cart_id.clone(),
                items: fixture.items.clone(),
                prices: fixture.prices.clone(),
                shipping_addresses: fixture.shipping_addresses.clone(),
                selected_payment_method: fixture.selected_payment_method.clone(),
            }),
        }))
    }

    async fn create_cart(&self) -> RemoteResult<CartId> {
        let mut state = self.state.write().await;
        state.record(RemoteOperation::CreateCart)?;
        Ok(state.new_cart(false))
    }

    async fn place_order(
        &self,
        cart_id: &CartId,
        token: &ChallengeToken,
    ) -> RemoteResult<PlaceOrderResult> {
        let (gate, failure) = {
            let mut state = self.state.write().await;
            state.tokens.push(token.clone());
            let failure = state.record(RemoteOperation::PlaceOrder);
            (state.place_order_gate.clone(), failure)
        };
        // The lock is released while held so other calls can proceed.
        if let Some(gate) = gate {
            gate.notified().await;
        }
        failure?;

        let mut state = self.state.write().await;
        state.active_cart(cart_id)?;
        if let Some(record) = state.carts.get_mut(cart_id) {
            record.active = false;
        }

        if let Some(result) = state.order_result.clone() {
            return Ok(result);
        }
        state.next_order += 1;
        let order_number = state
            .fixture
            .order_number
            .clone()
            .unwrap_or_else(|| format!("{:09}", state.next_order));
        Ok(PlaceOrderResult::with_order_number(order_number))
    }

    async fn evict_cart_cache(&self) -> RemoteResult<()> {
        let mut state = self.state.write().await;
        state.record(RemoteOperation::EvictCartCache)?;
        state.cache.remove("cart");
        Ok(())
    }

    async fn reset_cache(&self) -> RemoteResult<()> {
        let mut state = self.state.write().await;
        state.record(RemoteOperation::ResetCache)?;
        state.cache.clear();
        Ok(())
    }
}

#[derive(Default)]
struct SessionRecord {
    cart_id: Option<CartId>,
    removed: Vec<CartId>,
    created: Vec<CartId>,
    removal_failure: Option<RemoteError>,
    removal_gate: Option<Arc<Notify>>,
    removal_attempts: usize,
}

/// Session store keeping the active cart identifier in memory.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    record: Arc<RwLock<SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cart(cart_id: CartId) -> Self {
        let record = SessionRecord {
            cart_id: Some(cart_id),
            ..SessionRecord::default()
        };
        Self {
            record: Arc::new(RwLock::new(record)),
        }
    }

    pub async fn fail_removal(&self, error: RemoteError) {
        self.record.write().await.removal_failure = Some(error);
    }

    /// Holds every cart removal until the returned gate is notified.
    pub async fn hold_removal(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.record.write().await.removal_gate = Some(Arc::clone(&gate));
        gate
    }

    pub async fn removal_attempts(&self) -> usize {
        self.record.read().await.removal_attempts
    }

    pub async fn removed_carts(&self) -> Vec<CartId> {
        self.record.read().await.removed.clone()
    }

    pub async fn created_carts(&self) -> Vec<CartId> {
        self.record.read().await.created.clone()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn cart_id(&self) -> Option<CartId> {
        self.record.read().await.cart_id.clone()
    }

    async fn create_cart(&self, client: &dyn CommerceClient) -> RemoteResult<CartId> {
        let cart_id = client.create_cart().await?;
        let mut record = self.record.write().await;
        record.cart_id = Some(cart_id.clone());
        record.created.push(cart_id.clone());
        Ok(cart_id)
    }

    async fn remove_cart(&self) -> RemoteResult<()> {
        let gate = {
            let mut record = self.record.write().await;
            record.removal_attempts += 1;
            record.removal_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut record = self.record.write().await;
        if let Some(error) = record.removal_failure.clone() {
            return Err(error);
        }
        if let Some(cart_id) = record.cart_id.take() {
            record.removed.push(cart_id);
        }
        Ok(())
    }
}

#[derive(Default)]
struct ChallengeState {
    failure: Option<RemoteError>,
    gate: Option<Arc<Notify>>,
    requests: usize,
}

/// Challenge provider handing out a fixed token.
#[derive(Clone)]
pub struct StaticChallengeProvider {
    token: String,
    state: Arc<RwLock<ChallengeState>>,
}

impl StaticChallengeProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            state: Arc::default(),
        }
    }

    pub async fn fail(&self, error: RemoteError) {
        self.state.write().await.failure = Some(error);
    }

    /// Holds every token request until the returned gate is notified.
    pub async fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.write().await.gate = Some(Arc::clone(&gate));
        gate
    }

    pub async fn requests(&self) -> usize {
        self.state.read().await.requests
    }
}

#[async_trait]
impl ChallengeTokenProvider for StaticChallengeProvider {
    async fn generate_challenge_data(&self) -> RemoteResult<ChallengeToken> {
        let gate = {
            let mut state = self.state.write().await;
            state.requests += 1;
            state.gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.state.read().await.failure.clone() {
            Some(error) => Err(error),
            None => Ok(ChallengeToken::recaptcha(self.token.clone())),
        }
    }
}

/// Marker store backed by a map. Can be switched into a failing mode.
#[derive(Default, Clone)]
pub struct InMemoryMarkerStore {
    markers: Arc<RwLock<HashMap<String, String>>>,
    unavailable: Arc<RwLock<bool>>,
}

impl InMemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.markers.read().await.get(key).cloned()
    }
}

#[async_trait]
impl MarkerStore for InMemoryMarkerStore {
    async fn set_marker(&self, key: &str, value: &str) -> std::io::Result<()> {
        if *self.unavailable.read().await {
            return Err(std::io::Error::other("marker storage unavailable"));
        }
        self.markers
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Something the session emitted to the outside world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEntry {
    Event { event: AnalyticsEvent },
    Navigation { navigation: NavigationTarget },
}

/// Records analytics events and navigations in emission order.
#[derive(Default, Clone)]
pub struct InMemoryJournal {
    entries: Arc<RwLock<Vec<JournalEntry>>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<JournalEntry> {
        self.entries.read().await.clone()
    }

    pub async fn events(&self) -> Vec<AnalyticsEvent> {
        self.entries
            .read()
            .await
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Event { event } => Some(event.clone()),
                JournalEntry::Navigation { .. } => None,
            })
            .collect()
    }

    pub async fn event_types(&self) -> Vec<&'static str> {
        self.events()
            .await
            .iter()
            .map(AnalyticsEvent::event_type)
            .collect()
    }

    pub async fn navigations(&self) -> Vec<NavigationTarget> {
        self.entries
            .read()
            .await
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Navigation { navigation } => Some(navigation.clone()),
                JournalEntry::Event { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl AnalyticsDispatcher for InMemoryJournal {
    async fn dispatch(&self, event: AnalyticsEvent) {
        self.entries.write().await.push(JournalEntry::Event { event });
    }
}

#[async_trait]
impl Navigator for InMemoryJournal {
    async fn navigate(&self, navigation: NavigationTarget) {
        self.entries
            .write()
            .await
            .push(JournalEntry::Navigation { navigation });
    }
}

/// All in-memory collaborators of a checkout session, wired together.
#[derive(Clone)]
pub struct InMemoryBackend {
    pub commerce: InMemoryCommerceClient,
    pub session_store: InMemorySessionStore,
    pub challenge: StaticChallengeProvider,
    pub markers: InMemoryMarkerStore,
    pub journal: InMemoryJournal,
}

impl InMemoryBackend {
    /// Builds a backend whose session already holds a cart seeded from `fixture`.
    pub async fn seeded(fixture: CartFixture) -> Self {
        let commerce = InMemoryCommerceClient::with_fixture(fixture);
        let cart_id = commerce.seed_cart().await;
        Self {
            commerce,
            session_store: InMemorySessionStore::with_cart(cart_id),
            challenge: StaticChallengeProvider::new("in-memory-challenge"),
            markers: InMemoryMarkerStore::new(),
            journal: InMemoryJournal::new(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            commerce: Arc::new(self.commerce.clone()),
            session_store: Arc::new(self.session_store.clone()),
            challenge: Arc::new(self.challenge.clone()),
            analytics: Arc::new(self.journal.clone()),
            navigator: Arc::new(self.journal.clone()),
            markers: Arc::new(self.markers.clone()),
        }
    }
}
