//! The node-lifecycle event (§6.4): a typed, consumer-facing record distinct
//! from `tracing` output. Every node transition along `stream()`'s path is
//! rendered as one `Event` of a fixed `kind`, with the fields relevant to
//! that kind populated and the rest left `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STREAM_END_SCOPE: &str = "__flowgraph_stream_end__";

/// Which phase of a node's lifecycle this event describes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Enter,
    Exit,
    Edge,
    Error,
    End,
}

/// One node-lifecycle event (§6.4). Construct with [`Event::new`] and the
/// `with_*` builders rather than literal field initialization, since only a
/// subset of the optional fields is meaningful per `kind`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub kind: EventKind,
    pub node_id: String,
    pub node_label: String,
    pub node_type: String,
    pub iteration: u32,
    pub elapsed_ms: u64,
    pub event_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_summary: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    #[must_use]
    pub fn new(
        kind: EventKind,
        node_id: impl Into<String>,
        node_label: impl Into<String>,
        node_type: impl Into<String>,
        iteration: u32,
        elapsed_ms: u64,
        event_number: u64,
    ) -> Self {
        Self {
            kind,
            node_id: node_id.into(),
            node_label: node_label.into(),
            node_type: node_type.into(),
            iteration,
            elapsed_ms,
            event_number,
            state_summary: None,
            preview: None,
            delta: None,
            error_type: None,
            error_message: None,
            stop_reason: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_state_summary(mut self, summary: Value) -> Self {
        self.state_summary = Some(summary);
        self
    }

    #[must_use]
    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    #[must_use]
    pub fn with_delta(mut self, delta: Value) -> Self {
        self.delta = Some(delta);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self.error_message = Some(error_message.into());
        self
    }

    #[must_use]
    pub fn with_stop_reason(mut self, stop_reason: impl Into<String>) -> Self {
        self.stop_reason = Some(stop_reason.into());
        self
    }

    #[must_use]
    pub fn scope_label(&self) -> &str {
        &self.node_id
    }

    pub fn to_json_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}@{}] {:?} {} ({}ms)",
            self.node_id, self.iteration, self.kind, self.node_label, self.elapsed_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_event_carries_state_summary() {
        let event = Event::new(EventKind::Enter, "n1", "Classify", "classify", 0, 0, 1)
            .with_state_summary(serde_json::json!({"iteration": 0}));
        assert!(event.state_summary.is_some());
        assert!(event.preview.is_none());
    }

    #[test]
    fn error_event_serializes_error_fields_only() {
        let event =
            Event::new(EventKind::Error, "n2", "Answer", "answer", 1, 5, 2).with_error("timeout", "boom");
        let value = event.to_json_value();
        assert_eq!(value["errorType"], "timeout");
        assert_eq!(value["errorMessage"], "boom");
        assert!(value.get("preview").is_none());
    }
}
