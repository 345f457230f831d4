// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event type carried on the bus

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Open mapping from string key to dynamic value. Keys are case-sensitive.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A discrete message emitted by a producer.
///
/// Serializes with `{"id", "source", "type", "payload", "timestamp"}` keys.
/// `Clone` deep-copies the payload: a cloned event shares no payload state
/// with the original, which is what route tasks rely on for isolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Opaque unique id, UUID-style. Identity across the event log.
    pub id: String,

    /// Short identifier of the producer (e.g. "webhook-a", "supervisor").
    pub source: String,

    /// Producer-defined discriminator (e.g. "push", "alert").
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub payload: Payload,

    /// Producer-assigned wall-clock instant, epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
}

impl Event {
    /// Create an event with a fresh uuid and the current wall clock.
    pub fn new(source: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            kind: kind.into(),
            payload: Payload::new(),
            timestamp_ms: epoch_ms_now(),
        }
    }

    /// Create an event with an initial payload.
    pub fn with_payload(
        source: impl Into<String>,
        kind: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self { payload, ..Self::new(source, kind) }
    }

    /// Payload serialized as a JSON object string, for the event log.
    pub fn payload_text(&self) -> String {
        serde_json::Value::Object(self.payload.clone()).to_string()
    }
}

/// Current wall clock as epoch milliseconds.
pub(crate) fn epoch_ms_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
