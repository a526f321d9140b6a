// ============================================================================
// Event Store - durable keyed persistence
// ============================================================================
//
// Two operations against one keyed table:
// - put: upsert by (Id, Date); the backing table resolves concurrent
//   writers to the same key by last-write-wins.
// - scan_all: every stored event, store-native order. A failure partway
//   through aborts the whole scan; callers never see a truncated result.
//
// `scylla.rs` is the durable adapter; `memory.rs` backs local runs and
// tests with the same contract.
//
// ============================================================================

mod memory;
mod scylla;

pub use self::memory::MemoryEventStore;
pub use self::scylla::ScyllaEventStore;

use async_trait::async_trait;

use crate::event::{DeserializationError, Event, SerializationError};

/// Keyed, durable event persistence.
///
/// No ordering guarantee on `scan_all`; per-key atomicity on `put` is the
/// store's own concern, so callers need no coordination.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Write or overwrite the record keyed by (`Id`, `Date`). On success
    /// the record is visible to subsequent scans.
    async fn put(&self, event: &Event) -> Result<(), StoreError>;

    /// Every stored event. Finite; fully materialized for the caller.
    async fn scan_all(&self) -> Result<Vec<Event>, StoreError>;
}

/// The backing store rejected a read or write. Distinct from an upstream
/// deserialization failure; treated as transient by callers and propagated,
/// never retried in-process.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store rejected the request: {0}")]
    Backend(String),

    #[error("event could not be encoded for storage: {0}")]
    Encode(#[from] SerializationError),

    #[error("stored record could not be decoded: {0}")]
    Corrupt(#[from] DeserializationError),
}

impl StoreError {
    pub(crate) fn backend(cause: impl std::fmt::Display) -> Self {
        Self::Backend(cause.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_failures_are_not_reported_as_backend_rejections() {
        let cause = serde_json::from_str::<()>("not json").unwrap_err();
        let error = StoreError::from(SerializationError::from(cause));

        assert!(matches!(error, StoreError::Encode(_)));
        assert!(error.to_string().starts_with("event could not be encoded"));
    }
}

