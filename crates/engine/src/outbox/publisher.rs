//! Connection-aware publisher.
//!
//! `publish` either buffers (disconnected) or drains the backlog and then
//! sends live (connected). `flush` drains the backlog on its own, typically
//! right after a reconnect. Both run under one async mutex that is held
//! across the transport sends, so every queue mutation and every send on a
//! publisher is totally ordered: a live message can never overtake an
//! older buffered one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use pubrelay_domain::{BufferedEvent, QoS, Topic};
use serde::Serialize;
use tokio::sync::Mutex;

use super::error::PublishError;
use super::pending_queue::PendingQueue;
use crate::infrastructure::config::{LiveSendFailurePolicy, PublisherConfig};
use crate::infrastructure::ports::{ClockPort, TransportPort};

/// Point-in-time publisher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublisherStats {
    /// Messages sent directly while connected
    pub published_live: u64,
    /// Messages appended to the pending queue
    pub buffered: u64,
    /// Buffered messages delivered by a flush
    pub flushed: u64,
    /// Messages discarded (evicted, lost on a failed live send, or cleared on shutdown)
    pub dropped: u64,
    /// Failed live sends
    pub transmit_failures: u64,
    /// Flushes that stopped on a failed send
    pub flush_failures: u64,
    /// Entries currently pending
    pub pending: usize,
}

#[derive(Default)]
struct Counters {
    published_live: AtomicU64,
    buffered: AtomicU64,
    flushed: AtomicU64,
    dropped: AtomicU64,
    transmit_failures: AtomicU64,
    flush_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

struct PublisherInner {
    transport: Arc<dyn TransportPort>,
    clock: Arc<dyn ClockPort>,
    queue: Mutex<PendingQueue>,
    qos: QoS,
    live_failure_policy: LiveSendFailurePolicy,
    closed: AtomicBool,
    counters: Counters,
}

/// Outbound publisher with a store-and-forward backlog.
///
/// Cheap to clone; clones share the same queue and transport.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

impl Publisher {
    pub fn new(
        transport: Arc<dyn TransportPort>,
        clock: Arc<dyn ClockPort>,
        config: &PublisherConfig,
    ) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                transport,
                clock,
                queue: Mutex::new(PendingQueue::with_limit(config.queue_limit)),
                qos: config.qos,
                live_failure_policy: config.live_failure_policy,
                closed: AtomicBool::new(false),
                counters: Counters::default(),
            }),
        }
    }

    /// Publish a rendered payload on `topic`.
    ///
    /// Disconnected: the message is queued and the call succeeds.
    /// Connected: the backlog is flushed first, then the message is sent.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the topic is not a valid publish topic
    /// - `FlushFailed` if the backlog could not be drained
    /// - `TransmitFailed` if the live send failed
    /// - `QueueFull` if a bounded queue refused the message
    /// - `Closed` after `shutdown`
    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Vec<u8>>,
    ) -> Result<(), PublishError> {
        let topic = Topic::new(topic)?;
        self.publish_to(topic, payload.into()).await
    }

    /// Publish `value` rendered as JSON on `topic`.
    ///
    /// A rendering failure is reported as `InvalidArgument` and nothing is
    /// queued or sent.
    pub async fn publish_json<T>(&self, topic: &str, value: &T) -> Result<(), PublishError>
    where
        T: Serialize + ?Sized,
    {
        let topic = Topic::new(topic)?;
        let payload = serde_json::to_vec(value)?;
        self.publish_to(topic, payload).await
    }

    /// Publish to an already validated topic.
    pub async fn publish_to(&self, topic: Topic, payload: Vec<u8>) -> Result<(), PublishError> {
        let mut queue = self.inner.queue.lock().await;

        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(PublishError::Closed);
        }

        if !self.inner.transport.is_connected() {
            tracing::warn!(
                topic = %topic,
                len = payload.len(),
                pending = queue.len(),
                "Publishing while disconnected, queueing"
            );
            let event = BufferedEvent::new(topic, payload, self.inner.clock.now());
            return self.buffer(&mut queue, event);
        }

        if let Err(err) = self.flush_locked(&mut queue).await {
            self.handle_live_failure(&mut queue, topic, payload);
            return Err(err);
        }

        match self
            .inner
            .transport
            .send(&topic, &payload, self.inner.qos)
            .await
        {
            Ok(()) => {
                Counters::bump(&self.inner.counters.published_live, 1);
                tracing::debug!(
                    topic = %topic,
                    len = payload.len(),
                    qos = self.inner.qos.level(),
                    "Published message"
                );
                Ok(())
            }
            Err(source) => {
                Counters::bump(&self.inner.counters.transmit_failures, 1);
                tracing::warn!(topic = %topic, error = %source, "Failed to publish");
                let topic_name = topic.to_string();
                self.handle_live_failure(&mut queue, topic, payload);
                Err(PublishError::TransmitFailed {
                    topic: topic_name,
                    source,
                })
            }
        }
    }

    /// Send every buffered message in order.
    ///
    /// Succeeds without doing anything while disconnected or after
    /// `shutdown`. Stops at the first failed send: entries already sent stay
    /// removed, the failing entry and everything after it stay queued in
    /// order, and nothing after the failure is attempted.
    pub async fn flush(&self) -> Result<(), PublishError> {
        let mut queue = self.inner.queue.lock().await;

        if self.inner.closed.load(Ordering::SeqCst) {
            tracing::debug!("Publisher shut down, skipping flush");
            return Ok(());
        }

        self.flush_locked(&mut queue).await
    }

    /// Drop the backlog and refuse further work. Returns the number of
    /// messages discarded. Idempotent.
    pub async fn shutdown(&self) -> usize {
        let mut queue = self.inner.queue.lock().await;
        let was_closed = self.inner.closed.swap(true, Ordering::SeqCst);
        let dropped = queue.clear();

        if dropped > 0 {
            Counters::bump(&self.inner.counters.dropped, dropped as u64);
            tracing::warn!(dropped, "Discarding unsent messages on shutdown");
        }
        if !was_closed {
            tracing::info!("Publisher shut down");
        }
        dropped
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of buffered messages.
    pub async fn pending_len(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    pub async fn stats(&self) -> PublisherStats {
        let pending = self.pending_len().await;
        let c = &self.inner.counters;
        PublisherStats {
            published_live: c.published_live.load(Ordering::Relaxed),
            buffered: c.buffered.load(Ordering::Relaxed),
            flushed: c.flushed.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            transmit_failures: c.transmit_failures.load(Ordering::Relaxed),
            flush_failures: c.flush_failures.load(Ordering::Relaxed),
            pending,
        }
    }

    /// Payloads currently queued, head first.
    #[cfg(test)]
    pub(crate) async fn pending_payloads(&self) -> Vec<String> {
        self.inner
            .queue
            .lock()
            .await
            .iter()
            .map(|e| String::from_utf8_lossy(e.payload()).into_owned())
            .collect()
    }

    async fn flush_locked(&self, queue: &mut PendingQueue) -> Result<(), PublishError> {
        if !self.inner.transport.is_connected() {
            if !queue.is_empty() {
                tracing::warn!(
                    pending = queue.len(),
                    "Cannot publish queued messages while disconnected"
                );
            }
            return Ok(());
        }

        if queue.is_empty() {
            return Ok(());
        }

        let now = self.inner.clock.now();
        let mut sent = 0usize;
        let mut drain = queue.drain();

        while let Some(event) = drain.next() {
            tracing::info!(
                topic = %event.topic(),
                len = event.payload().len(),
                age_ms = event.age_at(now).num_milliseconds(),
                "Publishing queued message"
            );

            if let Err(source) = self
                .inner
                .transport
                .send(event.topic(), event.payload(), self.inner.qos)
                .await
            {
                drain.restore(event);
                let remaining = drain.remaining();
                Counters::bump(&self.inner.counters.flush_failures, 1);
                tracing::warn!(
                    error = %source,
                    sent,
                    remaining,
                    "Failed to publish queue entry"
                );
                return Err(PublishError::FlushFailed {
                    sent,
                    remaining,
                    source,
                });
            }

            sent += 1;
            Counters::bump(&self.inner.counters.flushed, 1);
        }

        tracing::debug!(sent, "Pending queue flushed");
        Ok(())
    }

    fn buffer(&self, queue: &mut PendingQueue, event: BufferedEvent) -> Result<(), PublishError> {
        let evicted = queue.append(event)?;
        Counters::bump(&self.inner.counters.buffered, 1);

        if let Some(evicted) = evicted {
            Counters::bump(&self.inner.counters.dropped, 1);
            tracing::warn!(
                topic = %evicted.topic(),
                len = evicted.payload().len(),
                "Pending queue full, dropped oldest message"
            );
        }
        Ok(())
    }

    fn handle_live_failure(&self, queue: &mut PendingQueue, topic: Topic, payload: Vec<u8>) {
        match self.inner.live_failure_policy {
            LiveSendFailurePolicy::Drop => {
                Counters::bump(&self.inner.counters.dropped, 1);
                tracing::warn!(topic = %topic, len = payload.len(), "Live message dropped");
            }
            LiveSendFailurePolicy::Requeue => {
                let event = BufferedEvent::new(topic, payload, self.inner.clock.now());
                if let Err(err) = self.buffer(queue, event) {
                    Counters::bump(&self.inner.counters.dropped, 1);
                    tracing::warn!(error = %err, "Could not requeue live message, dropped");
                }
            }
        }
    }
}
