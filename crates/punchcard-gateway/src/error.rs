//! Gateway error types.

/// Errors surfaced by REST gateway calls.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Transport-level failure before any server response arrived.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server rejected request (status {status})")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, when the body carried one.
        message: Option<String>,
    },

    /// The response body did not decode as the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Gateway result type.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// Build a rejection from a status code and raw response body,
    /// extracting the server's `message` field when present.
    pub fn rejected(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str().map(str::to_owned)));
        Self::Rejected { status, message }
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// The server's own message, when one was surfaced.
    ///
    /// Command failures are shown to the user verbatim from here when
    /// available, with a generic fallback otherwise.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}
