use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use std::sync::Arc;

use super::{EventStore, StoreError};
use crate::event::Event;

// ============================================================================
// ScyllaDB Event Store - the durable adapter
// ============================================================================
//
// One table, keyed by the event's composite key:
//
//   CREATE TABLE <table> (
//       id      text,
//       date    text,
//       payload text,
//       PRIMARY KEY ((id), date)
//   )
//
// `id` partitions, `date` clusters, so range access by time within an id
// stays possible even though the query path never uses it. INSERT is an
// upsert in CQL, which gives the last-write-wins overwrite per key without
// any read-before-write. The full event JSON is stored in `payload` so
// producer-defined fields survive verbatim.
//
// ============================================================================

const KEYSPACE: &str = "event_pipeline";

pub struct ScyllaEventStore {
    session: Arc<Session>,
    table_name: String,
}

impl ScyllaEventStore {
    /// Connect to a node and ensure the keyspace and table exist.
    ///
    /// The table name comes from configuration and is resolved once at
    /// process start; it is validated there, since CQL cannot bind
    /// identifiers as parameters.
    pub async fn connect(node: &str, table_name: &str) -> anyhow::Result<Self> {
        tracing::info!(node = %node, table = %table_name, "Connecting to ScyllaDB");
        let session: Session = SessionBuilder::new().known_node(node).build().await?;

        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {KEYSPACE} WITH REPLICATION = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}"
                ),
                &[],
            )
            .await?;
        session.use_keyspace(KEYSPACE, false).await?;

        session
            .query_unpaged(
                format!(
                    "CREATE TABLE IF NOT EXISTS {table_name} (\
                     id text, date text, payload text, PRIMARY KEY ((id), date))"
                ),
                &[],
            )
            .await?;

        Ok(Self {
            session: Arc::new(session),
            table_name: table_name.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl EventStore for ScyllaEventStore {
    async fn put(&self, event: &Event) -> Result<(), StoreError> {
        let payload = event.to_json()?;

        self.session
            .query_unpaged(
                format!(
                    "INSERT INTO {} (id, date, payload) VALUES (?, ?, ?)",
                    self.table_name
                ),
                (&event.id, &event.date, &payload),
            )
            .await
            .map_err(StoreError::backend)?;

        tracing::debug!(
            event_id = %event.id,
            event_date = %event.date,
            "Persisted event"
        );
        Ok(())
    }

    async fn scan_all(&self) -> Result<Vec<Event>, StoreError> {
        let result = self
            .session
            .query_unpaged(format!("SELECT payload FROM {}", self.table_name), &[])
            .await
            .map_err(StoreError::backend)?;

        let rows_result = result.into_rows_result().map_err(StoreError::backend)?;

        let mut events = Vec::new();
        for row in rows_result
            .rows::<(String,)>()
            .map_err(StoreError::backend)?
        {
            let (payload,) = row.map_err(StoreError::backend)?;
            // A record that no longer parses fails the whole scan rather
            // than silently shrinking the result set.
            events.push(Event::from_json(&payload)?);
        }

        tracing::debug!(count = events.len(), "Scanned event store");
        Ok(events)
    }
}
