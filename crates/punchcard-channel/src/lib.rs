//! # Punchcard Channel
//!
//! Server-initiated balance updates for the loyalty client.
//!
//! The channel manages a single push connection per session: it connects,
//! subscribes to the signed-in user's topic, and forwards every recognized
//! balance push to the consumer. Decoding is deliberately tolerant: a
//! malformed frame is logged and discarded, never fatal, and never
//! disconnects the channel.
//!
//! Transport is a seam: [`StreamTransport`] produces a bidirectional
//! [`TransportLink`], with a native WebSocket implementation and a
//! long-polling fallback for environments without streaming support. There
//! is no automatic reconnection; when the transport drops, the channel
//! parks in `Disconnected` and the consumer decides when to connect again.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod error;
pub mod transport;
pub mod wire;

pub use channel::{ChannelConfig, ChannelStatus, RealtimeChannel};
pub use error::{ChannelError, ChannelResult};
pub use transport::{LongPollTransport, StreamTransport, TransportLink, WebSocketTransport};
pub use wire::{ClientFrame, ServerFrame};
