//! Tolerant decoding of realtime balance payloads.
//!
//! Backend revisions disagree on the field carrying the new balance, so the
//! decoder recognizes either name and collapses everything else into
//! [`PointsPush::Unrecognized`], which callers log and discard. A malformed
//! payload never propagates as an error and never disconnects the channel.

use serde_json::Value;

/// Field names under which a push body may carry the balance.
const BALANCE_FIELDS: [&str; 2] = ["pointsBalance", "balance"];

/// The per-user topic carrying balance updates.
pub fn points_topic(user_id: i64) -> String {
    format!("points/{user_id}")
}

/// Result of decoding a push body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointsPush {
    /// The body carried a balance under one of the recognized field names.
    Recognized(i64),
    /// The body could not be interpreted as a balance update.
    Unrecognized,
}

impl PointsPush {
    /// Decode a raw push body.
    pub fn decode(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_value(&value),
            Err(_) => PointsPush::Unrecognized,
        }
    }

    /// Decode an already-parsed push body.
    pub fn from_value(value: &Value) -> Self {
        for field in BALANCE_FIELDS {
            if let Some(balance) = value.get(field).and_then(Value::as_i64) {
                return PointsPush::Recognized(balance);
            }
        }
        PointsPush::Unrecognized
    }
}
