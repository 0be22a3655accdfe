//! Stream message envelope.
//!
//! Every participant result arrives as `{key, value, headers}`: the key is the
//! correlation id of the saga, the `id` header identifies the event for
//! deduplication and the value is the JSON payload.

use chrono::{DateTime, Utc};

use crate::error::{IngestError, Result};
use crate::payload::StepPayload;

/// Header carrying the event id used for deduplication.
pub const EVENT_ID_HEADER: &str = "id";

/// A message as read from the transport, before any decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: Vec<(String, Vec<u8>)>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawMessage {
    /// Creates a message with a key and a body and no headers.
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Appends a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the value of the first header called `name`.
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_slice())
    }
}

/// A decoded participant result.
#[derive(Debug, Clone, PartialEq)]
pub struct StepEvent<T> {
    /// Deduplication id, taken from the `id` header.
    pub event_id: String,
    /// Saga correlation id, taken from the message key.
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: T,
}

impl<T: StepPayload> StepEvent<T> {
    /// Decodes a raw message into a typed event.
    pub fn from_raw(raw: &RawMessage) -> Result<Self> {
        let correlation_id = raw
            .key
            .as_deref()
            .ok_or(IngestError::MissingKey)
            .and_then(|key| utf8_field("key", key))?;
        if correlation_id.is_empty() {
            return Err(IngestError::MissingKey);
        }

        let event_id = raw
            .header(EVENT_ID_HEADER)
            .ok_or(IngestError::MissingHeader(EVENT_ID_HEADER))
            .and_then(|value| utf8_field(EVENT_ID_HEADER, value))?;
        if event_id.is_empty() {
            return Err(IngestError::MissingHeader(EVENT_ID_HEADER));
        }

        Ok(Self {
            event_id,
            correlation_id,
            timestamp: raw.timestamp.unwrap_or_else(Utc::now),
            payload: T::decode(&raw.value)?,
        })
    }

    /// Returns the saga step status this event reports.
    pub fn step_status(&self) -> saga::StepStatus {
        self.payload.step_status()
    }
}

fn utf8_field(name: &'static str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| IngestError::InvalidField {
        name,
        reason: e.to_string(),
    })
}
