//! A message held back while the transport is disconnected.

use chrono::{DateTime, Utc};

use crate::value_objects::Topic;

/// One entry of the pending publish queue.
///
/// Topic and payload are fixed at construction; the event is consumed by
/// value when it leaves the queue, so nothing outside the queue can hold on
/// to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedEvent {
    topic: Topic,
    payload: Vec<u8>,
    enqueued_at: DateTime<Utc>,
}

impl BufferedEvent {
    pub fn new(topic: Topic, payload: Vec<u8>, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            topic,
            payload,
            enqueued_at,
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// When the event entered the queue.
    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// How long the event has been waiting, clamped at zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.enqueued_at).max(chrono::Duration::zero())
    }
}
