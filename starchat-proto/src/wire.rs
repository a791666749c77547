//! Envelope types for the REST and realtime payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;

/// Generic `{ "data": ... }` wrapper used by the REST read endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    /// The payload.
    pub data: T,
}

/// Response body of a REST write (`POST /messages/__one`).
///
/// The endpoint reports success through `data` and failure through
/// `error`; an HTTP-success response may still carry an `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WriteResponse {
    /// The written record, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Backend-reported failure description, on rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A single insert event delivered on a realtime channel.
///
/// The provider delivers schema-wide inserts; `record.chat_id` is the
/// only room discriminator, so consumers filter at ingestion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertEvent {
    /// Event kind; always `"INSERT"` for this channel.
    pub event: String,
    /// Schema the event originated from.
    #[serde(default)]
    pub schema: Option<String>,
    /// The inserted message.
    pub record: Message,
}

impl InsertEvent {
    /// Whether this event is a message insert this core should ingest.
    #[must_use]
    pub fn is_insert(&self) -> bool {
        self.event == "INSERT"
    }
}
