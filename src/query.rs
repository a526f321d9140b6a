use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

use crate::event::SerializationError;
use crate::messaging::EventBus;
use crate::metrics::Metrics;
use crate::store::EventStore;

// ============================================================================
// Query Service - read side of the pipeline, plus the HTTP surface
// ============================================================================
//
// GET /events answers with the complete current event set as one JSON
// payload. Read-only: no events are created, modified, or deleted by a
// query. Any failure (scan, encode, timeout) aborts the invocation with a
// bare 500; there is never a partial payload.
//
// POST /publish is the transport inlet standing in for the broadcast
// topic's publish API; it hands the raw body to the bus untouched.
//
// ============================================================================

/// Per-query time budget. Matches the deployment's query timeout.
const QUERY_TIMEOUT: Duration = Duration::from_secs(15);

pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub bus: EventBus,
    pub metrics: Arc<Metrics>,
}

pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    tracing::info!(port, "Starting HTTP server");
    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/events", web::get().to(get_events))
            .route("/publish", web::post().to(publish))
            .route("/health", web::get().to(health))
            .route("/metrics", web::get().to(metrics_handler))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

/// One query invocation: scan everything, encode, answer.
async fn get_events(state: web::Data<AppState>) -> HttpResponse {
    state.metrics.query_requests.inc();

    let mut events = match tokio::time::timeout(QUERY_TIMEOUT, state.store.scan_all()).await {
        Ok(Ok(events)) => events,
        Ok(Err(error)) => {
            state.metrics.query_failures.inc();
            tracing::error!(%error, "Query scan failed");
            return HttpResponse::InternalServerError().finish();
        }
        Err(_) => {
            state.metrics.query_failures.inc();
            tracing::error!(budget = ?QUERY_TIMEOUT, "Query timed out");
            return HttpResponse::InternalServerError().finish();
        }
    };

    // Deterministic response order by (Id, Date); an added guarantee over
    // the store's native scan order.
    events.sort_by(|a, b| a.key().cmp(&b.key()));

    match serde_json::to_string(&events) {
        Ok(body) => {
            tracing::info!(count = events.len(), "Answered query");
            HttpResponse::Ok()
                .content_type("application/json")
                .body(body)
        }
        Err(error) => {
            let error = SerializationError::from(error);
            state.metrics.query_failures.inc();
            tracing::error!(%error, "Query response encoding failed");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Hand a serialized event to the broadcast channel. Delivery to the
/// ingestion side is asynchronous; 202 acknowledges acceptance only.
async fn publish(state: web::Data<AppState>, body: String) -> HttpResponse {
    let message_id = state.bus.publish(body);
    state.metrics.messages_published.inc();

    HttpResponse::Accepted().json(serde_json::json!({ "messageId": message_id }))
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "event-pipeline"
    }))
}

async fn metrics_handler(state: web::Data<AppState>) -> HttpResponse {
    let encoder = TextEncoder::new();
    let families = state.metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(error) = encoder.encode(&families, &mut buffer) {
        tracing::error!(%error, "Metrics encoding failed");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}
