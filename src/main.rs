use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod event;
mod messaging;
mod metrics;
mod processor;
mod query;
mod store;

use config::{Config, StoreBackend};
use messaging::EventBus;
use processor::IngestionProcessor;
use store::{EventStore, MemoryEventStore, ScyllaEventStore};

const BUS_CAPACITY: usize = 1024;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging with environment-based filtering.
    // Default to INFO, override with RUST_LOG (e.g. RUST_LOG=debug).
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,event_pipeline=debug")),
        )
        .init();

    tracing::info!("Starting event pipeline");

    // Configuration is resolved once and shared for the process lifetime.
    let config = Config::from_env()?;

    let store: Arc<dyn EventStore> = match config.backend {
        StoreBackend::Scylla => Arc::new(
            ScyllaEventStore::connect(&config.scylla_node, &config.table_name).await?,
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; events will not survive a restart");
            Arc::new(MemoryEventStore::new())
        }
    };

    let metrics = Arc::new(metrics::Metrics::new()?);
    let bus = EventBus::new(BUS_CAPACITY);

    // Ingestion side: one subscription, one spawned worker per delivery.
    let processor = Arc::new(IngestionProcessor::new(
        Arc::clone(&store),
        Arc::clone(&metrics),
    ));
    tokio::spawn(Arc::clone(&processor).run(bus.subscribe()));

    // Query side (plus the publish inlet and metrics scrape) runs until
    // the process is stopped.
    query::serve(
        query::AppState {
            store,
            bus,
            metrics,
        },
        config.http_port,
    )
    .await?;

    Ok(())
}
