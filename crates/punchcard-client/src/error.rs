//! Client error types.

use punchcard_channel::ChannelError;
use punchcard_gateway::GatewayError;

/// Errors surfaced by session lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// REST gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Realtime channel failure.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// No session is resolvable.
    #[error("no active session")]
    SessionAbsent,
}

/// Client result type.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Errors surfaced by user commands.
///
/// None of these are fatal; each maps to a message shown to the user while
/// the session and cached balance stay intact.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Another command is still in flight; the new one was rejected, not
    /// queued.
    #[error("another command is still processing")]
    Busy,

    /// No session is resolvable; nothing was sent.
    #[error("no active session")]
    SessionAbsent,

    /// The balance cannot cover the reward. Checked locally; no request
    /// was issued.
    #[error("{deficit} more points needed")]
    InsufficientPoints {
        /// How many points short the balance is (`cost − balance`).
        deficit: i64,
    },

    /// The server rejected the command.
    #[error("{}", message.as_deref().unwrap_or("command rejected"))]
    Rejected {
        /// The server's message, when its response carried one.
        message: Option<String>,
    },
}

impl CommandError {
    /// Build a rejection from a gateway failure, keeping the server's
    /// message when one was surfaced.
    pub fn rejected(err: &GatewayError) -> Self {
        Self::Rejected {
            message: err.server_message().map(str::to_owned),
        }
    }

    /// The message shown to the user: the server's own words when
    /// available, a generic fallback otherwise.
    pub fn user_message(&self) -> String {
        match self {
            Self::Busy => "Another action is still processing. Please wait.".to_string(),
            Self::SessionAbsent => "User not found. Please login again.".to_string(),
            Self::InsufficientPoints { deficit } => {
                format!("You need {deficit} more points to redeem this reward.")
            }
            Self::Rejected { message: Some(m) } => m.clone(),
            Self::Rejected { message: None } => "Payment failed. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_prefers_server_message_verbatim() {
        let gateway = GatewayError::rejected(402, r#"{"message":"Insufficient funds"}"#);
        let err = CommandError::rejected(&gateway);
        assert_eq!(err.user_message(), "Insufficient funds");
    }

    #[test]
    fn rejection_falls_back_to_generic_message() {
        let gateway = GatewayError::rejected(500, "");
        let err = CommandError::rejected(&gateway);
        assert_eq!(err.user_message(), "Payment failed. Please try again.");
    }

    #[test]
    fn deficit_message_names_the_gap() {
        let err = CommandError::InsufficientPoints { deficit: 20 };
        assert_eq!(
            err.user_message(),
            "You need 20 more points to redeem this reward."
        );
    }
}
