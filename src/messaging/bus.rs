use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

// ============================================================================
// Event Bus - broadcast delivery channel
// ============================================================================
//
// Fans each published message out to every subscriber. Delivery order
// across publishers and redelivery policy are channel concerns, not the
// pipeline's; subscribers that fall behind see a lag signal, not silent
// loss of the channel.
//
// ============================================================================

/// One delivered message: the serialized event plus channel-assigned
/// delivery metadata.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub message_id: Uuid,
    pub delivered_at: DateTime<Utc>,
    /// Whether the channel is delivering this message again after an
    /// earlier failed attempt.
    pub redelivered: bool,
    pub body: String,
}

impl InboundMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            delivered_at: Utc::now(),
            redelivered: false,
            body: body.into(),
        }
    }
}

/// Broadcast channel handle shared by producers and the ingestion side.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<InboundMessage>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a serialized event to every current subscriber. Returns the
    /// channel-assigned message id. Publishing with no subscribers is not
    /// an error; the message is simply dropped, as on an unsubscribed topic.
    pub fn publish(&self, body: impl Into<String>) -> Uuid {
        let message = InboundMessage::new(body);
        let message_id = message.message_id;
        let receivers = self.sender.send(message).unwrap_or(0);

        tracing::info!(
            message_id = %message_id,
            receivers,
            "Published message to event bus"
        );
        message_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
        self.sender.subscribe()
    }
}
