//! Frames exchanged with the push broker.

use serde::{Deserialize, Serialize};

/// Frames the client sends to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Subscribe to a topic; the broker starts delivering matching frames.
    Subscribe {
        /// Topic to subscribe to, e.g. `points/42`.
        topic: String,
    },
}

/// A frame the broker delivers on a subscription.
///
/// The body is kept opaque here; interpreting it is the subscriber's
/// concern, and bodies that fail to decode are discarded rather than
/// treated as fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    /// Topic the frame was published on.
    pub topic: String,
    /// Structured payload.
    pub body: serde_json::Value,
}
