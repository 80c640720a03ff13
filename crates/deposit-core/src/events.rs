//! # Event Tracking
//!
//! Append-only analytics sink. Emitting is fire-and-forget: it never
//! blocks, never fails, and never propagates an error into checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A single tracked event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub payload: Value,
}

/// Sink for named analytics events with small JSON payloads.
///
/// Implementations must swallow their own failures; a broken sink must
/// never fail the flow that emitted the event.
pub trait EventSink: Send + Sync {
    fn emit(&self, name: &str, payload: Value);
}

pub type SharedEventSink = Arc<dyn EventSink>;

/// Strip credential fields before an event payload is logged or stored
fn sanitize(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => {
            map.remove("password");
            map.remove("passwordHash");
            Value::Object(map)
        }
        other => other,
    }
}

/// In-memory append-only event log
#[derive(Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<TrackedEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event emitted so far, in order
    pub fn snapshot(&self) -> Vec<TrackedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Names of every event emitted so far, in order
    pub fn event_names(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|e| e.event).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for MemoryEventLog {
    fn emit(&self, name: &str, payload: Value) {
        let payload = sanitize(payload);
        debug!(event = name, payload = %payload, "tracked event");

        if let Ok(mut events) = self.events.lock() {
            events.push(TrackedEvent {
                timestamp: Utc::now(),
                event: name.to_string(),
                payload,
            });
        }
    }
}

/// Sink that drops everything (for callers that opt out of tracking)
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _name: &str, _payload: Value) {}
}
