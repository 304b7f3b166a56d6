//! Error types for port operations.

/// Failure reported by the transport for a single send attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The broker connection is down.
    #[error("Not connected to broker")]
    NotConnected,

    /// The broker or client library refused the message.
    #[error("Send failed: {0}")]
    SendFailed(String),
}

impl TransportError {
    /// Create a SendFailed error.
    pub fn send_failed(message: impl ToString) -> Self {
        Self::SendFailed(message.to_string())
    }
}
