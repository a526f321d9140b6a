use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

// ============================================================================
// Metrics - Prometheus counters for the pipeline
// ============================================================================
//
// Scraped via /metrics on the query server.
//
// ============================================================================

/// Central metrics registry for the application.
pub struct Metrics {
    registry: Registry,

    pub messages_published: IntCounter,
    pub events_ingested: IntCounter,
    pub ingest_failures: IntCounterVec,
    pub query_requests: IntCounter,
    pub query_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let messages_published = IntCounter::new(
            "messages_published_total",
            "Messages published to the event bus",
        )?;
        registry.register(Box::new(messages_published.clone()))?;

        let events_ingested = IntCounter::new(
            "events_ingested_total",
            "Events successfully persisted to the store",
        )?;
        registry.register(Box::new(events_ingested.clone()))?;

        let ingest_failures = IntCounterVec::new(
            Opts::new("ingest_failures_total", "Failed ingestion invocations"),
            &["reason"],
        )?;
        registry.register(Box::new(ingest_failures.clone()))?;

        let query_requests =
            IntCounter::new("query_requests_total", "Query invocations received")?;
        registry.register(Box::new(query_requests.clone()))?;

        let query_failures = IntCounter::new(
            "query_failures_total",
            "Query invocations that returned a failure response",
        )?;
        registry.register(Box::new(query_failures.clone()))?;

        Ok(Self {
            registry,
            messages_published,
            events_ingested,
            ingest_failures,
            query_requests,
            query_failures,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
