//! FIFO of messages waiting for the broker connection.
//!
//! The queue is not synchronised; the publisher serialises every access
//! under its own lock.

use std::collections::VecDeque;

use pubrelay_domain::BufferedEvent;

use super::error::PublishError;
use crate::infrastructure::config::{OverflowPolicy, QueueLimit};

/// Ordered pending queue. Insertion order is publish-attempt order.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<BufferedEvent>,
    limit: QueueLimit,
}

impl PendingQueue {
    /// Create an unbounded queue.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: QueueLimit) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Append at the tail.
    ///
    /// Unbounded queues always accept. A full bounded queue either evicts
    /// its head (returned as `Some`) or refuses with `QueueFull`, depending
    /// on its overflow policy.
    pub fn append(&mut self, event: BufferedEvent) -> Result<Option<BufferedEvent>, PublishError> {
        let Some(capacity) = self.limit.capacity() else {
            self.entries.push_back(event);
            return Ok(None);
        };

        if self.entries.len() < capacity {
            self.entries.push_back(event);
            return Ok(None);
        }

        match self.limit.overflow {
            OverflowPolicy::RejectNew => Err(PublishError::QueueFull { capacity }),
            OverflowPolicy::DropOldest => {
                let evicted = self.entries.pop_front();
                self.entries.push_back(event);
                Ok(evicted)
            }
        }
    }

    /// Start a destructive, forward-only drain from the head.
    pub fn drain(&mut self) -> Drain<'_> {
        Drain {
            entries: &mut self.entries,
        }
    }

    /// Drop every entry. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordered read-only view.
    pub fn iter(&self) -> impl Iterator<Item = &BufferedEvent> {
        self.entries.iter()
    }
}

/// Draining iterator over a `PendingQueue`.
///
/// Every `next()` removes the head entry. Stopping early leaves the
/// unconsumed entries in place and in order; consumed entries are gone
/// unless handed back with `restore`.
pub struct Drain<'a> {
    entries: &'a mut VecDeque<BufferedEvent>,
}

impl Drain<'_> {
    /// Put an entry back at the head of the queue.
    pub fn restore(&mut self, event: BufferedEvent) {
        self.entries.push_front(event);
    }

    /// Entries still in the queue.
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl Iterator for Drain<'_> {
    type Item = BufferedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.entries.len(), Some(self.entries.len()))
    }
}
