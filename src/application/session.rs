use super::pipeline::{self, Liveness};
use super::reconcile::{self, QueryState};
use crate::config::CheckoutConfig;
use crate::domain::cart::{
    CartId, CartItem, CheckoutDetails, Customer, OrderDetailsSnapshot, PaymentMethod,
    SnapshotSlot, filter_payment_methods,
};
use crate::domain::events::{AnalyticsEvent, EventContext, derive_event};
use crate::domain::order::{CheckoutError, OrderPlacementRequest, PlaceOrderResult};
use crate::domain::ports::Collaborators;
use crate::domain::step::{ActiveContent, CheckoutStep, StepMachine, Transition};
use crate::error::RemoteError;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Mutable state of one checkout session.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub machine: StepMachine,
    pub placement: OrderPlacementRequest,
    pub snapshot: SnapshotSlot,
    pub checkout: QueryState<CheckoutDetails>,
    pub customer: QueryState<Customer>,
    pub cart_id: Option<CartId>,
    pub signed_in: bool,
    pub place_order_result: Option<PlaceOrderResult>,
    pub error: Option<CheckoutError>,
    pub cleanup_warnings: Vec<String>,
    pub guest_sign_in_username: String,
    pub is_updating: bool,
}

impl SessionState {
    pub fn cart_items(&self) -> &[CartItem] {
        self.checkout
            .data()
            .map(|details| details.items.as_slice())
            .unwrap_or_default()
    }

    pub fn order_number(&self) -> Option<&str> {
        self.place_order_result
            .as_ref()
            .and_then(PlaceOrderResult::order_number)
    }

    /// Records the active cart. A different cart invalidates the cached
    /// checkout details.
    pub fn track_cart(&mut self, cart_id: Option<CartId>) {
        if self.cart_id != cart_id {
            self.checkout = if cart_id.is_some() {
                QueryState::Loading
            } else {
                QueryState::Idle
            };
            self.cart_id = cart_id;
        }
    }

    pub fn derive_event(&self) -> Option<AnalyticsEvent> {
        derive_event(&EventContext {
            step: self.machine.step(),
            cart_id: self.cart_id.as_ref(),
            cart_items: self.cart_items(),
            review_requested: self.machine.review_requested(),
            placement: &self.placement,
            snapshot: self.snapshot.cart(),
            order_number: self.order_number(),
        })
    }
}

/// What the presentation layer sees of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutView {
    pub step: CheckoutStep,
    pub active_content: ActiveContent,
    pub cart_id: Option<CartId>,
    pub cart_items: Vec<CartItem>,
    pub available_payment_methods: Vec<PaymentMethod>,
    pub customer: Option<Customer>,
    pub is_cart_empty: bool,
    pub is_guest_checkout: bool,
    pub is_loading: bool,
    pub is_updating: bool,
    pub order_details_loading: bool,
    pub place_order_loading: bool,
    pub place_order_button_clicked: bool,
    pub is_placing_order: bool,
    pub review_order_button_clicked: bool,
    pub order_details: Option<OrderDetailsSnapshot>,
    pub order_number: Option<String>,
    pub error: Option<CheckoutError>,
    pub cleanup_warnings: Vec<String>,
    pub guest_sign_in_username: String,
}

impl CheckoutView {
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Why a place-order intent was not acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoCart,
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    OrderDetailsUnavailable(RemoteError),
    EmptyOrderDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentOutcome {
    /// The snapshot was taken and the placement pipeline started.
    Accepted,
    Ignored(IgnoreReason),
    Rejected(RejectReason),
    /// The session ended while the order details were loading.
    Cancelled,
}

pub(crate) struct SessionInner {
    pub collaborators: Collaborators,
    pub config: CheckoutConfig,
    pub state: Mutex<SessionState>,
    pub liveness: Liveness,
    pub pipeline: Mutex<Option<JoinHandle<()>>>,
}

impl SessionInner {
    pub async fn publish(&self, event: Option<AnalyticsEvent>) {
        if let Some(event) = event {
            debug!(event = event.event_type(), "dispatching analytics event");
            self.collaborators.analytics.dispatch(event).await;
        }
    }
}

/// Drives one shopper through the checkout funnel.
///
/// The session owns the step machine and the placement flags. Presentation
/// code reads them through [`CheckoutSession::view`] and changes them only
/// through the operations below.
#[derive(Clone)]
pub struct CheckoutSession {
    inner: Arc<SessionInner>,
}

impl CheckoutSession {
    pub fn new(collaborators: Collaborators, config: CheckoutConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                collaborators,
                config,
                state: Mutex::new(SessionState::default()),
                liveness: Liveness::default(),
                pipeline: Mutex::new(None),
            }),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.inner.liveness.is_alive()
    }

    pub async fn view(&self) -> CheckoutView {
        let state = self.inner.state.lock().await;
        let details = state.checkout.data();
        CheckoutView {
            step: state.machine.step(),
            active_content: state.machine.active_content(),
            cart_id: state.cart_id.clone(),
            cart_items: state.cart_items().to_vec(),
            available_payment_methods: details
                .map(|details| {
                    filter_payment_methods(
                        &details.available_payment_methods,
                        &self.inner.config.disabled_payment_methods,
                    )
                })
                .unwrap_or_default(),
            customer: state.customer.data().cloned(),
            is_cart_empty: details.is_none_or(|details| details.total_quantity == 0),
            is_guest_checkout: !state.signed_in,
            is_loading: !state.checkout.is_ready() || state.customer.is_pending(),
            is_updating: state.is_updating,
            order_details_loading: state.placement.order_details_loading(),
            place_order_loading: state.placement.place_order_loading(),
            place_order_button_clicked: state.placement.button_clicked(),
            is_placing_order: state.placement.is_placing_order(),
            review_order_button_clicked: state.machine.review_requested(),
            order_details: state.snapshot.get().cloned(),
            order_number: state.order_number().map(str::to_string),
            error: state.error.clone(),
            cleanup_warnings: state.cleanup_warnings.clone(),
            guest_sign_in_username: state.guest_sign_in_username.clone(),
        }
    }

    /// Re-issues the checkout-details and customer queries.
    ///
    /// Query failures degrade to a loading state. A failure proving the cart
    /// is dead replaces it with a fresh one.
    pub async fn refresh(&self) {
        let collaborators = &self.inner.collaborators;
        let cart_id = collaborators.session_store.cart_id().await;
        let signed_in = {
            let mut state = self.inner.state.lock().await;
            state.track_cart(cart_id.clone());
            if state.signed_in {
                state.customer = QueryState::Loading;
            }
            state.signed_in
        };

        let batch =
            reconcile::run_queries(collaborators.commerce.as_ref(), cart_id.as_ref(), signed_in)
                .await;
        if !self.is_alive() {
            return;
        }

        let (invalidated, event) = {
            let mut state = self.inner.state.lock().await;
            let invalidated = reconcile::apply_queries(&mut state, batch);
            (invalidated, state.derive_event())
        };
        self.inner.publish(event).await;

        if let Some(error) = invalidated {
            self.replace_dead_cart(error).await;
        }
    }

    async fn replace_dead_cart(&self, error: RemoteError) {
        let collaborators = &self.inner.collaborators;
        warn!(%error, "active cart rejected by backend, replacing it");
        if let Err(error) = collaborators.session_store.remove_cart().await {
            warn!(%error, "failed to remove dead cart");
        }
        let created = collaborators
            .session_store
            .create_cart(collaborators.commerce.as_ref())
            .await;
        if !self.is_alive() {
            return;
        }
        match created {
            Ok(cart_id) => {
                info!(%cart_id, "created replacement cart");
                self.inner.state.lock().await.track_cart(Some(cart_id));
            }
            Err(error) => {
                warn!(%error, "failed to create replacement cart");
                self.inner.state.lock().await.track_cart(None);
            }
        }
    }

    pub async fn complete_shipping_address(&self) -> Option<Transition> {
        self.transition(StepMachine::complete_shipping_address).await
    }

    pub async fn complete_shipping_method(&self) -> Option<Transition> {
        self.transition(StepMachine::complete_shipping_method).await
    }

    /// Moves from payment to review. The returned transition asks the
    /// presentation layer to scroll to the top.
    pub async fn complete_payment(&self) -> Option<Transition> {
        self.transition(StepMachine::complete_payment).await
    }

    async fn transition(&self, apply: fn(&mut StepMachine) -> Option<Transition>) -> Option<Transition> {
        let (transition, event) = {
            let mut state = self.inner.state.lock().await;
            let transition = apply(&mut state.machine);
            let event = transition.and_then(|_| state.derive_event());
            (transition, event)
        };
        match transition {
            Some(transition) => {
                debug!(from = ?transition.from, to = ?transition.to, "checkout step advanced")
            }
            None => debug!("completion signal ignored for current step"),
        }
        self.inner.publish(event).await;
        transition
    }

    pub async fn request_review(&self) -> bool {
        self.update_review(StepMachine::request_review).await
    }

    pub async fn reset_review(&self) -> bool {
        self.update_review(StepMachine::reset_review).await
    }

    async fn update_review(&self, apply: fn(&mut StepMachine) -> bool) -> bool {
        let (changed, event) = {
            let mut state = self.inner.state.lock().await;
            let changed = apply(&mut state.machine);
            let event = if changed { state.derive_event() } else { None };
            (changed, event)
        };
        self.inner.publish(event).await;
        changed
    }

    pub async fn toggle_address_book(&self) -> ActiveContent {
        let mut state = self.inner.state.lock().await;
        state.machine.toggle_address_book();
        state.machine.active_content()
    }

    pub async fn toggle_sign_in(&self) -> ActiveContent {
        let mut state = self.inner.state.lock().await;
        state.machine.toggle_sign_in();
        state.machine.active_content()
    }

    /// Signing in collapses any secondary panel back to the checkout form.
    pub async fn set_signed_in(&self, signed_in: bool) {
        let mut state = self.inner.state.lock().await;
        state.signed_in = signed_in;
        if signed_in {
            state.machine.collapse_panel();
        } else {
            state.customer = QueryState::Idle;
        }
    }

    pub async fn set_guest_sign_in_username(&self, username: impl Into<String>) {
        self.inner.state.lock().await.guest_sign_in_username = username.into();
    }

    pub async fn set_is_updating(&self, is_updating: bool) {
        self.inner.state.lock().await.is_updating = is_updating;
    }

    /// Starts placing the order for the active cart.
    ///
    /// Takes a fresh order-details snapshot, accepts the intent and hands
    /// the rest to a background pipeline task. Ignored while another
    /// attempt is in flight.
    pub async fn place_order_intent(&self) -> IntentOutcome {
        let collaborators = &self.inner.collaborators;
        let Some(cart_id) = collaborators.session_store.cart_id().await else {
            debug!("place order ignored: no active cart");
            return IntentOutcome::Ignored(IgnoreReason::NoCart);
        };

        {
            let mut state = self.inner.state.lock().await;
            if !self.is_alive() {
                debug!("place order ignored: session has ended");
                return IntentOutcome::Cancelled;
            }
            if !state.placement.begin_details_fetch() {
                debug!("place order ignored: an attempt is already in flight");
                return IntentOutcome::Ignored(IgnoreReason::InFlight);
            }
        }

        let fetched = collaborators.commerce.fetch_order_details(&cart_id).await;

        let event = {
            let mut state = self.inner.state.lock().await;
            state.placement.finish_details_fetch();
            if !self.is_alive() {
                return IntentOutcome::Cancelled;
            }
            let snapshot = match fetched {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    warn!(%error, "order details unavailable, place order not accepted");
                    return IntentOutcome::Rejected(RejectReason::OrderDetailsUnavailable(error));
                }
            };
            if !state.snapshot.offer(snapshot) {
                warn!(%cart_id, "order details came back empty, place order not accepted");
                return IntentOutcome::Rejected(RejectReason::EmptyOrderDetails);
            }
            state.placement.accept(cart_id.clone());
            state.place_order_result = None;
            state.cleanup_warnings.clear();
            state.derive_event()
        };
        info!(%cart_id, "place order accepted");

        self.persist_order_marker().await;
        self.inner.publish(event).await;

        let handle = tokio::spawn(pipeline::run(Arc::clone(&self.inner), cart_id));
        *self.inner.pipeline.lock().await = Some(handle);
        IntentOutcome::Accepted
    }

    async fn persist_order_marker(&self) {
        let key = &self.inner.config.order_marker_key;
        if let Err(error) = self.inner.collaborators.markers.set_marker(key, "1").await {
            warn!(%error, key = %key, "unable to persist order marker");
        }
    }

    /// Waits for the background placement task, if one is running.
    pub async fn wait_for_placement(&self) {
        let handle = self.inner.pipeline.lock().await.take();
        if let Some(handle) = handle
            && let Err(error) = handle.await
        {
            warn!(%error, "placement task did not finish cleanly");
        }
    }

    /// Ends the session. Pending continuations stop applying results.
    pub async fn teardown(&self) {
        self.inner.liveness.end();
        self.inner.state.lock().await.placement.settle();
        debug!("checkout session torn down");
    }
}
