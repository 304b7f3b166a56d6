//! Background worker that drains the pending queue whenever the broker
//! connection comes back.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::publisher::Publisher;
use crate::messaging::{ConnectionState, ConnectionStateObserver};

/// Handle to the reconnect flush worker.
pub struct ReconnectFlusher {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl ReconnectFlusher {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// Flushes once immediately if already connected, then on every
    /// transition into `Connected`. Flush errors are logged; whatever is left
    /// in the queue waits for the next reconnect or the next publish.
    pub fn spawn(
        publisher: Publisher,
        observer: ConnectionStateObserver,
        cancel: CancellationToken,
    ) -> Self {
        let handle = tokio::spawn(reconnect_worker(publisher, observer, cancel.clone()));
        Self { handle, cancel }
    }

    /// Cancel the worker and wait for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Reconnect flush worker panicked");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn reconnect_worker(
    publisher: Publisher,
    mut observer: ConnectionStateObserver,
    cancel_token: CancellationToken,
) {
    tracing::info!("Starting reconnect flush worker");

    if observer.is_connected() {
        flush_pending(&publisher).await;
    }

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                tracing::info!("Reconnect flush worker shutting down");
                break;
            }
            change = observer.changed() => match change {
                Some(ConnectionState::Connected) => flush_pending(&publisher).await,
                Some(state) => {
                    tracing::debug!(state = %state, "Connection state changed, nothing to flush");
                }
                None => {
                    tracing::info!("Connection state closed, reconnect flush worker exiting");
                    break;
                }
            },
        }
    }
}

async fn flush_pending(publisher: &Publisher) {
    let pending = publisher.pending_len().await;
    if pending == 0 {
        return;
    }

    tracing::info!(pending, "Connected, flushing pending messages");
    if let Err(e) = publisher.flush().await {
        tracing::warn!(error = %e, "Reconnect flush incomplete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::config::PublisherConfig;
    use crate::infrastructure::memory_transport::InMemoryTransport;
    use std::sync::Arc;
    use std::time::Duration;

    async fn wait_for_sent(transport: &InMemoryTransport, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while transport.sent().await.len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("messages were not flushed in time");
    }

    fn publisher_over(transport: Arc<InMemoryTransport>) -> Publisher {
        Publisher::new(
            transport,
            Arc::new(SystemClock::new()),
            &PublisherConfig::default(),
        )
    }

    #[tokio::test]
    async fn flushes_when_connection_returns() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = publisher_over(transport.clone());
        publisher.publish("t", "m1").await.unwrap();
        publisher.publish("t", "m2").await.unwrap();

        let flusher = ReconnectFlusher::spawn(
            publisher.clone(),
            transport.observer(),
            CancellationToken::new(),
        );
        transport.connect();

        wait_for_sent(&transport, 2).await;
        assert_eq!(transport.sent_payloads().await, vec!["m1", "m2"]);
        assert_eq!(publisher.pending_len().await, 0);

        flusher.stop().await;
    }

    #[tokio::test]
    async fn flushes_immediately_if_already_connected() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = publisher_over(transport.clone());
        publisher.publish("t", "m1").await.unwrap();
        transport.connect();

        let flusher = ReconnectFlusher::spawn(
            publisher.clone(),
            transport.observer(),
            CancellationToken::new(),
        );

        wait_for_sent(&transport, 1).await;
        flusher.stop().await;
    }

    #[tokio::test]
    async fn stops_on_cancel() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = publisher_over(transport.clone());
        let cancel = CancellationToken::new();

        let flusher = ReconnectFlusher::spawn(publisher, transport.observer(), cancel.clone());
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(2), async {
            while !flusher.is_finished() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("worker did not stop");
    }
}
