//! Channel error types.

/// Errors surfaced by the realtime channel and its transports.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Establishing the connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// An operation did not complete within its deadline.
    #[error("{0} timed out")]
    Timeout(String),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Channel result type.
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

impl ChannelError {
    /// Create a connection error.
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    /// Create a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout(operation.into())
    }

    /// Create a send error.
    pub fn send_failed(msg: impl Into<String>) -> Self {
        Self::SendFailed(msg.into())
    }
}
