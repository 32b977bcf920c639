use super::{Envelope, EventPublisher, OrderEvent, PublishError, Topic};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// In-process fan-out of encoded events.
///
/// Publishing with no subscriber is not an error: at-most-once delivery means an event
/// nobody listens to is simply dropped. A subscriber that falls more than `capacity`
/// events behind loses the oldest ones.
#[derive(Debug, Clone)]
pub struct BroadcastBus {
    sender: broadcast::Sender<Envelope>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastBus {
    async fn publish(&self, topic: Topic, event: &OrderEvent) -> Result<(), PublishError> {
        let envelope = Envelope::encode(topic, event)?;
        match self.sender.send(envelope) {
            Ok(receivers) => debug!(%topic, event_id = %event.event_id, receivers, "Published"),
            Err(_) => debug!(%topic, event_id = %event.event_id, "Published with no subscriber"),
        }
        Ok(())
    }
}

/// Writes each event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, topic: Topic, event: &OrderEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(event)?;
        info!(%topic, order_id = %event.order_id, %payload, "Order event");
        Ok(())
    }
}
