//! Errors returned by the outbound publisher.

use pubrelay_domain::DomainError;
use thiserror::Error;

use crate::infrastructure::ports::TransportError;

/// Publisher operation errors.
///
/// Nothing here is retried internally; the caller decides whether and when
/// to try again (typically another `flush` on the next reconnect).
#[derive(Debug, Error)]
pub enum PublishError {
    /// Topic or payload could not be built. Caller bug, not retryable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A live (non-buffered) send failed.
    #[error("Transmit failed on {topic}: {source}")]
    TransmitFailed {
        topic: String,
        #[source]
        source: TransportError,
    },

    /// A buffered send failed while draining. The failing entry and
    /// everything after it are still pending; `flush` can be retried.
    #[error("Flush failed after {sent} sent, {remaining} still pending: {source}")]
    FlushFailed {
        sent: usize,
        remaining: usize,
        #[source]
        source: TransportError,
    },

    /// A bounded pending queue refused a new entry.
    #[error("Pending queue full ({capacity} entries)")]
    QueueFull { capacity: usize },

    /// The publisher has been shut down.
    #[error("Publisher is shut down")]
    Closed,
}

impl From<DomainError> for PublishError {
    fn from(err: DomainError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArgument(format!("payload rendering failed: {}", err))
    }
}
