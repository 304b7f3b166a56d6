//! pubrelay - demo entry point.
//!
//! Runs the publisher against the in-memory transport through one outage:
//! events raised while disconnected are buffered and go out in order once
//! the connection returns.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pubrelay_domain::AppEvent;
use pubrelay_engine::infrastructure::clock::SystemClock;
use pubrelay_engine::infrastructure::memory_transport::InMemoryTransport;
use pubrelay_engine::messaging::EventBus;
use pubrelay_engine::{EventRelay, Publisher, PublisherConfig, ReconnectFlusher};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pubrelay_engine=debug,pubrelay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting pubrelay");

    let config = PublisherConfig::from_env()?;
    tracing::info!(
        topic = %config.pub_topic,
        qos = config.qos.level(),
        max_pending = ?config.queue_limit.capacity(),
        overflow = %config.queue_limit.overflow,
        live_failure_policy = %config.live_failure_policy,
        "Loaded configuration"
    );

    let transport = Arc::new(InMemoryTransport::new());
    let publisher = Publisher::new(transport.clone(), Arc::new(SystemClock::new()), &config);

    let bus = EventBus::new();
    let relay = EventRelay::new(publisher.clone(), config.pub_topic.clone())
        .attach(&bus)
        .await;

    let cancel_token = CancellationToken::new();
    let flusher = ReconnectFlusher::spawn(publisher.clone(), transport.observer(), cancel_token);

    // Broker unreachable: everything is buffered.
    for (event_type, class) in [
        ("REGISTERING", "register"),
        ("REGISTER_OK", "register"),
        ("CALL_INCOMING", "call"),
    ] {
        let event = AppEvent::new(event_type).with_class(class);
        bus.dispatch(&event).await;
    }
    let pending = publisher.pending_len().await;
    tracing::info!(pending, "Events buffered during outage");

    // Connect callback fires; the reconnect flusher drains the backlog.
    transport.connect();
    tokio::time::timeout(Duration::from_secs(5), async {
        while publisher.pending_len().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .context("pending queue was not drained after reconnect")?;

    let closed = AppEvent::new("CALL_CLOSED").with_class("call");
    bus.dispatch(&closed).await;

    for message in transport.sent().await {
        tracing::info!(topic = %message.topic, payload = %message.payload_str(), "Sent");
    }

    let stats = publisher.stats().await;
    tracing::info!(stats = %serde_json::to_string(&stats)?, "Publisher stats");

    relay.detach().await;
    flusher.stop().await;
    publisher.shutdown().await;

    tracing::info!("pubrelay stopped");
    Ok(())
}
