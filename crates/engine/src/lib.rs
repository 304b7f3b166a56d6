//! pubrelay Engine library.
//!
//! Store-and-forward buffering in front of a pub/sub broker transport.
//!
//! ## Structure
//!
//! - `infrastructure/` - Ports (transport, clock), configuration, in-memory transport
//! - `messaging/` - Connection state and the application event bus
//! - `outbox/` - Pending queue, publisher, event relay, reconnect flusher

pub mod infrastructure;
pub mod messaging;
pub mod outbox;

pub use infrastructure::config::PublisherConfig;
pub use outbox::{EventRelay, PublishError, Publisher, PublisherStats, ReconnectFlusher};
