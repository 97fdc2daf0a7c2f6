//! Application layer containing the checkout orchestration.
//!
//! `CheckoutSession` is the entry point for the presentation layer. It owns
//! the funnel state, reconciles query results and hands accepted place-order
//! intents to the placement pipeline, which runs as a `tokio` task.

pub mod pipeline;
pub mod reconcile;
pub mod session;
pub mod signal;
