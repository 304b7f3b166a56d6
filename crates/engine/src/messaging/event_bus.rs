//! Event Bus for application events.
//!
//! The application core dispatches `AppEvent`s here; registered listeners
//! (such as the broker relay) receive each event in registration order.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use pubrelay_domain::AppEvent;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Something that reacts to application events.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, event: &AppEvent);
}

/// Identifies one registration on an `EventBus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Push-based event bus.
///
/// The bus holds strong references to listeners, so they persist until
/// explicitly unregistered or the bus is dropped.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<Vec<(ListenerId, Arc<dyn EventListener>)>>>,
}

impl EventBus {
    /// Create a new EventBus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for all events.
    pub async fn register(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.write().await.push((id, listener));
        tracing::debug!(listener_id = %id, "Registered event listener");
        id
    }

    /// Remove a listener. Returns false if the id was not registered.
    pub async fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().await;
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = listeners.len() != before;
        if removed {
            tracing::debug!(listener_id = %id, "Unregistered event listener");
        }
        removed
    }

    /// Dispatch an event to all listeners.
    ///
    /// Listeners registered or removed while a dispatch is running take
    /// effect from the next dispatch.
    pub async fn dispatch(&self, event: &AppEvent) {
        let listeners: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .await
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener.on_event(event).await;
        }
    }

    /// Get the number of listeners.
    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }

    /// Remove all listeners.
    pub async fn clear(&self) {
        self.listeners.write().await.clear();
    }
}
