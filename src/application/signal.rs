use super::session::CheckoutSession;
use crate::error::EngineError;
use serde::Deserialize;
use tracing::debug;

/// A shopper action replayed against a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Refresh,
    CompleteShippingAddress,
    CompleteShippingMethod,
    CompletePayment,
    RequestReview,
    ResetReview,
    PlaceOrder,
    Wait,
    SignIn,
    SignOut,
    ToggleAddressBook,
    ToggleSignIn,
    GuestUsername(String),
    Teardown,
}

/// One row of a signal script.
#[derive(Debug, Deserialize)]
pub struct SignalRecord {
    pub signal: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl TryFrom<SignalRecord> for Signal {
    type Error = EngineError;

    fn try_from(record: SignalRecord) -> Result<Self, Self::Error> {
        let signal = match record.signal.as_str() {
            "refresh" => Signal::Refresh,
            "complete_shipping_address" => Signal::CompleteShippingAddress,
            "complete_shipping_method" => Signal::CompleteShippingMethod,
            "complete_payment" => Signal::CompletePayment,
            "request_review" => Signal::RequestReview,
            "reset_review" => Signal::ResetReview,
            "place_order" => Signal::PlaceOrder,
            "wait" => Signal::Wait,
            "sign_in" => Signal::SignIn,
            "sign_out" => Signal::SignOut,
            "toggle_address_book" => Signal::ToggleAddressBook,
            "toggle_sign_in" => Signal::ToggleSignIn,
            "guest_username" => Signal::GuestUsername(record.value.unwrap_or_default()),
            "teardown" => Signal::Teardown,
            other => return Err(EngineError::UnknownSignal(other.to_string())),
        };
        Ok(signal)
    }
}

impl Signal {
    pub async fn apply(self, session: &CheckoutSession) {
        debug!(signal = ?self, "applying signal");
        match self {
            Signal::Refresh => session.refresh().await,
            Signal::CompleteShippingAddress => {
                session.complete_shipping_address().await;
            }
            Signal::CompleteShippingMethod => {
                session.complete_shipping_method().await;
            }
            Signal::CompletePayment => {
                session.complete_payment().await;
            }
            Signal::RequestReview => {
                session.request_review().await;
            }
            Signal::ResetReview => {
                session.reset_review().await;
            }
            Signal::PlaceOrder => {
                session.place_order_intent().await;
            }
            Signal::Wait => session.wait_for_placement().await,
            Signal::SignIn => session.set_signed_in(true).await,
            Signal::SignOut => session.set_signed_in(false).await,
            Signal::ToggleAddressBook => {
                session.toggle_address_book().await;
            }
            Signal::ToggleSignIn => {
                session.toggle_sign_in().await;
            }
            Signal::GuestUsername(username) => session.set_guest_sign_in_username(username).await,
            Signal::Teardown => session.teardown().await,
        }
    }
}
