use super::session::SessionState;
use crate::domain::cart::{CartId, CheckoutDetails, Customer};
use crate::domain::ports::{CommerceClient, RemoteResult};
use crate::error::RemoteError;
use tracing::warn;

/// Lifecycle of a subscribed query result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueryState<T> {
    /// Skipped: its precondition (a cart, a signed-in shopper) is missing.
    #[default]
    Idle,
    Loading,
    Ready(T),
    /// The last attempt failed; shown as loading until the next refresh.
    Failed(RemoteError),
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, QueryState::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, QueryState::Loading | QueryState::Failed(_))
    }

    pub fn resolve(&mut self, result: RemoteResult<T>) {
        *self = match result {
            Ok(data) => QueryState::Ready(data),
            Err(error) => QueryState::Failed(error),
        };
    }
}

/// Raw results of one refresh. `None` marks a skipped query.
#[derive(Debug)]
pub(crate) struct QueryBatch {
    pub checkout: Option<RemoteResult<CheckoutDetails>>,
    pub customer: Option<RemoteResult<Customer>>,
}

/// Issues the checkout-details and customer queries concurrently.
pub(crate) async fn run_queries(
    commerce: &dyn CommerceClient,
    cart_id: Option<&CartId>,
    signed_in: bool,
) -> QueryBatch {
    let checkout = async {
        match cart_id {
            Some(cart_id) => Some(commerce.fetch_checkout_details(cart_id).await),
            None => None,
        }
    };
    let customer = async {
        if signed_in {
            Some(commerce.fetch_customer().await)
        } else {
            None
        }
    };
    let (checkout, customer) = tokio::join!(checkout, customer);
    QueryBatch { checkout, customer }
}

/// Folds a batch into the session state.
///
/// Returns the error that invalidated the active cart, if any.
pub(crate) fn apply_queries(state: &mut SessionState, batch: QueryBatch) -> Option<RemoteError> {
    let mut invalidated = None;

    match batch.checkout {
        Some(result) => {
            if let Err(error) = &result {
                warn!(%error, "checkout details query failed");
                if error.invalidates_cart() {
                    invalidated = Some(error.clone());
                }
            }
            state.checkout.resolve(result);
        }
        None => state.checkout = QueryState::Idle,
    }

    match batch.customer {
        Some(result) => {
            if let Err(error) = &result {
                warn!(%error, "customer query failed");
            }
            state.customer.resolve(result);
        }
        None => state.customer = QueryState::Idle,
    }

    invalidated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_state_resolution() {
        let mut query: QueryState<u32> = QueryState::Loading;
        assert!(query.is_pending());

        query.resolve(Ok(7));
        assert_eq!(query.data(), Some(&7));
        assert!(query.is_ready());

        query.resolve(Err(RemoteError::Network("offline".to_string())));
        assert_eq!(query.data(), None);
        assert!(query.is_pending());
    }

    #[test]
    fn test_idle_query_is_not_pending() {
        let query: QueryState<u32> = QueryState::default();
        assert!(!query.is_pending());
        assert!(!query.is_ready());
    }

    #[test]
    fn test_apply_flags_cart_invalidation() {
        let mut state = SessionState::default();
        let batch = QueryBatch {
            checkout: Some(Err(RemoteError::GraphQl("The cart isn't active".to_string()))),
            customer: None,
        };

        let invalidated = apply_queries(&mut state, batch);
        assert!(invalidated.is_some());
        assert!(state.checkout.is_pending());
        assert_eq!(state.customer, QueryState::Idle);
    }

    #[test]
    fn test_apply_ready_results() {
        let mut state = SessionState::default();
        let batch = QueryBatch {
            checkout: Some(Ok(CheckoutDetails::default())),
            customer: Some(Ok(Customer {
                email: "ada@example.com".to_string(),
                firstname: "Ada".to_string(),
                lastname: "Lovelace".to_string(),
            })),
        };

        assert!(apply_queries(&mut state, batch).is_none());
        assert!(state.checkout.is_ready());
        assert_eq!(state.customer.data().unwrap().firstname, "Ada");
    }
}
