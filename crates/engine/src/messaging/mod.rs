//! Connection state and event delivery.
//!
//! - `ConnectionStateHandle` / `ConnectionStateObserver`: broker connection lifecycle
//! - `EventBus`: push-based delivery of application events to listeners

pub mod connection;
pub mod event_bus;

pub use connection::{ConnectionState, ConnectionStateHandle, ConnectionStateObserver};
pub use event_bus::{EventBus, EventListener, ListenerId};
