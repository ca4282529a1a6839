//! Signal - a general-purpose event shape for domain layers.
//!
//! The propagation graph is generic over its event type; `Signal` is simply
//! a convenient default for node logic that does not need its own enum.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NodeId;

/// A named event carrying an arbitrary JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// What happened (e.g., "door_opened", "threshold_crossed").
    pub kind: String,

    /// Event data; `Value::Null` when the kind alone is enough.
    #[serde(default)]
    pub payload: Value,

    /// The node that produced this signal, if known.
    #[serde(default)]
    pub origin: Option<NodeId>,
}

impl Signal {
    /// Create a signal with no payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
            origin: None,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Stamp the producing node.
    pub fn with_origin(mut self, origin: NodeId) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Check the signal's kind.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}
