use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Event Model - canonical in-memory event and its JSON wire contract
// ============================================================================
//
// An event is identified by the producer-supplied (`Id`, `Date`) pair; the
// pair is the storage key. Everything else in the payload belongs to the
// producer's schema and is carried opaquely so it round-trips without loss.
//
// ============================================================================

/// A domain event as produced upstream and persisted by the pipeline.
///
/// `Id` is opaque and producer-supplied; uniqueness across time is the
/// producer's responsibility. `Date` is a string-encoded timestamp
/// (ISO-8601 recommended, so lexicographic order is time order).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    #[serde(rename = "Id")]
    pub id: String,

    #[serde(rename = "Date")]
    pub date: String,

    /// Producer-defined fields, kept verbatim.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Event {
    /// The composite storage key. Two writes with the same key overwrite
    /// (last-write-wins); there is no merge.
    pub fn key(&self) -> (&str, &str) {
        (&self.id, &self.date)
    }

    /// Encode the event for storage or for a response payload.
    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode an inbound message body. Fails when the body is not
    /// well-formed JSON or lacks the required `Id`/`Date` fields.
    pub fn from_json(body: &str) -> Result<Self, DeserializationError> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Inbound payload is not a well-formed event. Non-retryable here; retry,
/// if any, is the delivery channel's redelivery policy.
#[derive(Debug, thiserror::Error)]
#[error("payload is not a well-formed event: {0}")]
pub struct DeserializationError(#[from] serde_json::Error);

/// A fetched event could not be encoded into a payload.
#[derive(Debug, thiserror::Error)]
#[error("event could not be encoded: {0}")]
pub struct SerializationError(#[from] serde_json::Error);
