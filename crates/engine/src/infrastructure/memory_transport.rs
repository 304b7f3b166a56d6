//! In-memory transport for development and testing
//!
//! Records every accepted message instead of talking to a broker. Send
//! outcomes can be scripted, and the connection state is driven through the
//! same `ConnectionStateHandle` a real client would update from its
//! connect/disconnect callbacks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pubrelay_domain::{QoS, Topic};
use tokio::sync::Mutex;

use crate::infrastructure::ports::{TransportError, TransportPort};
use crate::messaging::{ConnectionState, ConnectionStateHandle, ConnectionStateObserver};

/// A message accepted by the in-memory transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub topic: Topic,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

impl SentMessage {
    /// Payload as UTF-8 text, lossy.
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// In-memory transport implementation
pub struct InMemoryTransport {
    connection: ConnectionStateHandle,
    sent: Mutex<Vec<SentMessage>>,
    scripted: Mutex<VecDeque<Result<(), TransportError>>>,
    attempts: AtomicUsize,
}

impl InMemoryTransport {
    /// Create a transport in the `Disconnected` state.
    pub fn new() -> Self {
        Self::with_connection(ConnectionStateHandle::new())
    }

    pub fn with_connection(connection: ConnectionStateHandle) -> Self {
        Self {
            connection,
            sent: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Simulate the connect callback.
    pub fn connect(&self) {
        self.connection.set(ConnectionState::Connected);
    }

    /// Simulate the disconnect callback.
    pub fn disconnect(&self) {
        self.connection.set(ConnectionState::Disconnected);
    }

    pub fn observer(&self) -> ConnectionStateObserver {
        self.connection.observer()
    }

    /// Queue outcomes for the next sends, consumed one per attempt.
    /// Once the script runs out every send succeeds.
    pub async fn script(&self, outcomes: impl IntoIterator<Item = Result<(), TransportError>>) {
        self.scripted.lock().await.extend(outcomes);
    }

    /// Messages accepted so far, in send order.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Payloads accepted so far as text, in send order.
    pub async fn sent_payloads(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(SentMessage::payload_str)
            .collect()
    }

    /// Number of send attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportPort for InMemoryTransport {
    async fn send(&self, topic: &Topic, payload: &[u8], qos: QoS) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if !self.connection.is_connected() {
            return Err(TransportError::NotConnected);
        }

        if let Some(outcome) = self.scripted.lock().await.pop_front() {
            outcome?;
        }

        self.sent.lock().await.push(SentMessage {
            topic: topic.clone(),
            payload: payload.to_vec(),
            qos,
        });
        tracing::debug!(
            topic = %topic,
            len = payload.len(),
            "In-memory transport accepted message"
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}
