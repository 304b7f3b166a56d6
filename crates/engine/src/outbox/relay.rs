//! Relays application events to the broker.

use std::sync::Arc;

use async_trait::async_trait;
use pubrelay_domain::{AppEvent, Topic};

use super::publisher::Publisher;
use crate::messaging::{EventBus, EventListener, ListenerId};

/// Event listener that publishes every event as JSON on one topic.
///
/// Publishing errors are logged and swallowed; dispatch has no caller to
/// report them to.
pub struct EventRelay {
    publisher: Publisher,
    topic: Topic,
}

impl EventRelay {
    pub fn new(publisher: Publisher, topic: Topic) -> Self {
        Self { publisher, topic }
    }

    /// Register on `bus`. Keep the returned registration to detach later.
    pub async fn attach(self, bus: &EventBus) -> RelayRegistration {
        let topic = self.topic.clone();
        let id = bus.register(Arc::new(self)).await;
        tracing::info!(topic = %topic, listener_id = %id, "Event relay attached");
        RelayRegistration {
            bus: bus.clone(),
            id,
        }
    }
}

#[async_trait]
impl EventListener for EventRelay {
    async fn on_event(&self, event: &AppEvent) {
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(
                    event_type = event.event_type(),
                    event_class = event.class(),
                    error = %e,
                    "Failed to render event"
                );
                return;
            }
        };

        if let Err(e) = self.publisher.publish_to(self.topic.clone(), payload).await {
            tracing::warn!(
                event_type = event.event_type(),
                event_class = event.class(),
                topic = %self.topic,
                error = %e,
                "Failed to relay event"
            );
        }
    }
}

/// Handle for a relay registered on an `EventBus`.
pub struct RelayRegistration {
    bus: EventBus,
    id: ListenerId,
}

impl RelayRegistration {
    /// Stop relaying. Returns false if the relay was already gone (for
    /// example after `EventBus::clear`).
    pub async fn detach(self) -> bool {
        let removed = self.bus.unregister(self.id).await;
        if removed {
            tracing::info!(listener_id = %self.id, "Event relay detached");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::config::PublisherConfig;
    use crate::infrastructure::ports::{MockTransportPort, TransportError};
    use std::sync::Mutex as StdMutex;

    fn relay_setup(transport: MockTransportPort) -> (Publisher, EventBus) {
        let publisher = Publisher::new(
            Arc::new(transport),
            Arc::new(SystemClock::new()),
            &PublisherConfig::default(),
        );
        (publisher, EventBus::new())
    }

    fn relay_topic() -> Topic {
        Topic::new("pubrelay/event").unwrap()
    }

    #[tokio::test]
    async fn relays_event_as_json_on_configured_topic() {
        let captured = Arc::new(StdMutex::new(Vec::<(String, String)>::new()));
        let sink = captured.clone();
        let mut transport = MockTransportPort::new();
        transport.expect_is_connected().return_const(true);
        transport
            .expect_send()
            .times(1)
            .returning(move |topic, payload, _| {
                let body = String::from_utf8(payload.to_vec()).unwrap();
                sink.lock().unwrap().push((topic.to_string(), body));
                Ok(())
            });
        let (publisher, bus) = relay_setup(transport);
        let relay = EventRelay::new(publisher, relay_topic());
        let _registration = relay.attach(&bus).await;

        let event = AppEvent::new("CALL_INCOMING").with_class("call");
        bus.dispatch(&event).await;

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].0, "pubrelay/event");
        let json: serde_json::Value = serde_json::from_str(&captured[0].1).unwrap();
        assert_eq!(json["type"], "CALL_INCOMING");
        assert_eq!(json["class"], "call");
    }

    #[tokio::test]
    async fn relay_buffers_while_disconnected() {
        let mut transport = MockTransportPort::new();
        transport.expect_is_connected().return_const(false);
        transport.expect_send().never();
        let (publisher, bus) = relay_setup(transport);
        let relay = EventRelay::new(publisher.clone(), relay_topic());
        let _registration = relay.attach(&bus).await;

        bus.dispatch(&AppEvent::new("REGISTER_OK")).await;

        assert_eq!(publisher.pending_len().await, 1);
    }

    #[tokio::test]
    async fn relay_swallows_publish_failures() {
        let mut transport = MockTransportPort::new();
        transport.expect_is_connected().return_const(true);
        transport
            .expect_send()
            .returning(|_, _, _| Err(TransportError::send_failed("broker busy")));
        let (publisher, bus) = relay_setup(transport);
        let relay = EventRelay::new(publisher.clone(), relay_topic());
        let _registration = relay.attach(&bus).await;

        bus.dispatch(&AppEvent::new("CALL_CLOSED")).await;

        assert_eq!(publisher.stats().await.transmit_failures, 1);
    }

    #[tokio::test]
    async fn detach_unregisters_relay() {
        let mut transport = MockTransportPort::new();
        transport.expect_is_connected().never();
        let (publisher, bus) = relay_setup(transport);
        let relay = EventRelay::new(publisher, relay_topic());
        let registration = relay.attach(&bus).await;
        assert_eq!(bus.listener_count().await, 1);

        assert!(registration.detach().await);

        assert_eq!(bus.listener_count().await, 0);
        bus.dispatch(&AppEvent::new("CALL_CLOSED")).await;
    }
}
