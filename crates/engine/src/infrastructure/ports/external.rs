//! Transport port: the broker connection the outbound buffer publishes through.

use async_trait::async_trait;
use pubrelay_domain::{QoS, Topic};

use super::error::TransportError;

/// One-shot publisher to the broker plus the connection fact it owns.
///
/// `send` is a single attempt with no retry. `is_connected` must be cheap and
/// non-blocking; it is consulted under the publisher lock on every call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportPort: Send + Sync {
    async fn send(&self, topic: &Topic, payload: &[u8], qos: QoS) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}
