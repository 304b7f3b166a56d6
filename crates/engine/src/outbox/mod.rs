//! Outbound store-and-forward buffer.
//!
//! - `pending_queue` - FIFO of messages held while the broker is unreachable
//! - `publisher` - connection-aware publish/flush over a `TransportPort`
//! - `relay` - forwards application events from the `EventBus`
//! - `reconnect` - drains the queue when the connection comes back

pub mod error;
pub mod pending_queue;
pub mod publisher;
pub mod reconnect;
pub mod relay;


pub use error::PublishError;
pub use pending_queue::{Drain, PendingQueue};
pub use publisher::{Publisher, PublisherStats};
pub use reconnect::ReconnectFlusher;
pub use relay::{EventRelay, RelayRegistration};
