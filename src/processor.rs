use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::event::{DeserializationError, Event};
use crate::messaging::InboundMessage;
use crate::metrics::Metrics;
use crate::store::{EventStore, StoreError};

// ============================================================================
// Ingestion Processor - bridge from the event bus to the store
// ============================================================================
//
// One invocation per delivered message: deserialize, put, done. Each
// invocation runs in its own spawned task, so concurrent deliveries are
// handled by independent stateless workers whose only shared resource is
// the store itself; per-key last-write-wins in the store is the sole
// concurrency control.
//
// A failed invocation is reported and dropped; redelivery is the channel's
// policy, never an internal retry loop.
//
// ============================================================================

/// Per-invocation time budget. Matches the deployment's processor timeout.
const INVOCATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Why an ingestion invocation failed.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("ingestion did not complete within {0:?}")]
    Timeout(Duration),
}

impl IngestError {
    fn reason(&self) -> &'static str {
        match self {
            Self::Deserialization(_) => "deserialization",
            Self::Store(_) => "store",
            Self::Timeout(_) => "timeout",
        }
    }
}

pub struct IngestionProcessor {
    store: Arc<dyn EventStore>,
    metrics: Arc<Metrics>,
}

impl IngestionProcessor {
    pub fn new(store: Arc<dyn EventStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Consume the subscription until the channel closes, spawning one
    /// worker task per delivered message. A lagged subscriber logs the gap
    /// and keeps consuming; skipped messages are the channel's to redeliver.
    pub async fn run(self: Arc<Self>, mut messages: broadcast::Receiver<InboundMessage>) {
        loop {
            match messages.recv().await {
                Ok(message) => {
                    let processor = Arc::clone(&self);
                    tokio::spawn(async move {
                        processor.ingest(&message).await;
                    });
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Ingestion subscriber lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, stopping ingestion");
                    break;
                }
            }
        }
    }

    /// One complete ingestion invocation, bounded by the time budget.
    pub async fn ingest(&self, message: &InboundMessage) {
        let outcome = match tokio::time::timeout(INVOCATION_TIMEOUT, self.handle(message)).await {
            Ok(result) => result,
            Err(_) => Err(IngestError::Timeout(INVOCATION_TIMEOUT)),
        };

        if let Err(error) = outcome {
            self.metrics
                .ingest_failures
                .with_label_values(&[error.reason()])
                .inc();
            tracing::error!(
                message_id = %message.message_id,
                redelivered = message.redelivered,
                %error,
                "Ingestion invocation failed"
            );
        }
    }

    /// Deserialize the message body and persist the event. Fails the whole
    /// invocation on either step; no placeholder record is ever written.
    pub async fn handle(&self, message: &InboundMessage) -> Result<Event, IngestError> {
        let event = Event::from_json(&message.body)?;

        self.store.put(&event).await?;
        self.metrics.events_ingested.inc();

        tracing::info!(
            message_id = %message.message_id,
            delivered_at = %message.delivered_at,
            event_id = %event.id,
            event_date = %event.date,
            "Ingested event"
        );
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::EventBus;
    use crate::store::MemoryEventStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store double whose writes can be switched into a simulated outage.
    struct OutageStore {
        inner: MemoryEventStore,
        failing: AtomicBool,
    }

    impl OutageStore {
        fn new() -> Self {
            Self {
                inner: MemoryEventStore::new(),
                failing: AtomicBool::new(false),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl EventStore for OutageStore {
        async fn put(&self, event: &Event) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("simulated outage".to_string()));
            }
            self.inner.put(event).await
        }

        async fn scan_all(&self) -> Result<Vec<Event>, StoreError> {
            self.inner.scan_all().await
        }
    }

    fn processor(store: Arc<dyn EventStore>) -> IngestionProcessor {
        IngestionProcessor::new(store, Arc::new(Metrics::new().unwrap()))
    }

    fn message(body: &str) -> InboundMessage {
        InboundMessage::new(body)
    }

    #[tokio::test]
    async fn stores_a_well_formed_event() {
        let store = Arc::new(MemoryEventStore::new());
        let processor = processor(store.clone());

        let stored = processor
            .handle(&message(
                r#"{"Id":"order-1","Date":"2024-01-01T00:00:00Z","amount":42}"#,
            ))
            .await
            .unwrap();

        assert_eq!(stored.payload["amount"], json!(42));
        assert_eq!(store.scan_all().await.unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn malformed_message_fails_without_touching_the_store() {
        let store = Arc::new(MemoryEventStore::new());
        let processor = processor(store.clone());

        let err = processor.handle(&message("{\"Date\":\"x\"")).await;
        assert!(matches!(err, Err(IngestError::Deserialization(_))));
        assert!(store.scan_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_store_error_and_leaves_history_intact() {
        let store = Arc::new(OutageStore::new());
        let processor = processor(store.clone());

        processor
            .handle(&message(r#"{"Id":"a","Date":"2024-01-01T00:00:00Z"}"#))
            .await
            .unwrap();

        store.set_failing(true);
        let err = processor
            .handle(&message(r#"{"Id":"b","Date":"2024-01-02T00:00:00Z"}"#))
            .await;
        assert!(matches!(err, Err(IngestError::Store(_))));

        store.set_failing(false);
        let all = store.scan_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn invocation_over_budget_is_reported_as_a_timeout() {
        struct StalledStore;

        #[async_trait::async_trait]
        impl EventStore for StalledStore {
            async fn put(&self, _: &Event) -> Result<(), StoreError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            async fn scan_all(&self) -> Result<Vec<Event>, StoreError> {
                Ok(Vec::new())
            }
        }

        let metrics = Arc::new(Metrics::new().unwrap());
        let processor = IngestionProcessor::new(Arc::new(StalledStore), Arc::clone(&metrics));

        processor
            .ingest(&message(r#"{"Id":"a","Date":"2024-01-01T00:00:00Z"}"#))
            .await;

        assert_eq!(
            metrics.ingest_failures.with_label_values(&["timeout"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn malformed_delivery_does_not_disturb_a_concurrent_valid_one() {
        let store = Arc::new(MemoryEventStore::new());
        let bus = EventBus::new(16);
        let processor = Arc::new(processor(store.clone()));
        let worker = tokio::spawn(Arc::clone(&processor).run(bus.subscribe()));

        bus.publish("not an event");
        bus.publish(r#"{"Id":"order-1","Date":"2024-01-01T00:00:00Z","amount":42}"#);

        // Ingestion is eventually consistent; poll until the valid event lands.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let all = store.scan_all().await.unwrap();
            if all.len() == 1 {
                assert_eq!(all[0].id, "order-1");
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "event never landed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        drop(bus);
        worker.await.unwrap();
    }
}
