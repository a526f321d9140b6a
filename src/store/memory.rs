use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{EventStore, StoreError};
use crate::event::Event;

// ============================================================================
// In-Memory Event Store
// ============================================================================
//
// Same contract as the ScyllaDB adapter, backed by a map keyed on
// (Id, Date). Backs local runs (EVENT_STORE_BACKEND=memory) and unit tests
// without a database. Not durable across restarts.
//
// ============================================================================

#[derive(Default)]
pub struct MemoryEventStore {
    records: RwLock<HashMap<(String, String), Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryEventStore {
    async fn put(&self, event: &Event) -> Result<(), StoreError> {
        let key = (event.id.clone(), event.date.clone());
        self.records.write().await.insert(key, event.clone());
        Ok(())
    }

    async fn scan_all(&self) -> Result<Vec<Event>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(id: &str, date: &str, amount: i64) -> Event {
        let mut payload = serde_json::Map::new();
        payload.insert("amount".to_string(), json!(amount));
        Event {
            id: id.to_string(),
            date: date.to_string(),
            payload,
        }
    }

    #[tokio::test]
    async fn scan_of_empty_store_is_an_empty_success() {
        let store = MemoryEventStore::new();
        assert!(store.scan_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn identical_put_twice_leaves_one_record() {
        let store = MemoryEventStore::new();
        let e = event("order-1", "2024-01-01T00:00:00Z", 42);
        store.put(&e).await.unwrap();
        store.put(&e).await.unwrap();

        let all = store.scan_all().await.unwrap();
        assert_eq!(all, vec![e]);
    }

    #[tokio::test]
    async fn same_key_different_payload_is_last_write_wins() {
        let store = MemoryEventStore::new();
        store
            .put(&event("order-1", "2024-01-01T00:00:00Z", 1))
            .await
            .unwrap();
        store
            .put(&event("order-1", "2024-01-01T00:00:00Z", 2))
            .await
            .unwrap();

        let all = store.scan_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].payload["amount"], json!(2));
    }

    #[tokio::test]
    async fn distinct_keys_are_all_returned() {
        let store = MemoryEventStore::new();
        let written: Vec<Event> = (0..5)
            .map(|n| event(&format!("order-{n}"), "2024-01-01T00:00:00Z", n))
            .collect();
        for e in &written {
            store.put(e).await.unwrap();
        }

        let mut all = store.scan_all().await.unwrap();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(all, written);
    }

    #[tokio::test]
    async fn same_id_different_date_are_distinct_records() {
        let store = MemoryEventStore::new();
        store
            .put(&event("order-1", "2024-01-01T00:00:00Z", 1))
            .await
            .unwrap();
        store
            .put(&event("order-1", "2024-01-02T00:00:00Z", 2))
            .await
            .unwrap();

        assert_eq!(store.scan_all().await.unwrap().len(), 2);
    }
}
