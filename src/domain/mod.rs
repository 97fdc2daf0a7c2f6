//! Domain layer: checkout value types, the step machine, analytics event
//! derivation and the ports through which remote collaborators are reached.

pub mod cart;
pub mod events;
pub mod order;
pub mod ports;
pub mod step;
