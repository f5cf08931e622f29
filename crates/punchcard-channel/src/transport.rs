//! Streaming transport seam and its two implementations.
//!
//! The channel itself only speaks [`TransportLink`]; the WebSocket
//! implementation covers environments with native streaming support, and
//! the long-polling implementation stands in where a proxy or runtime rules
//! that out.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{ChannelError, ChannelResult};

/// A live bidirectional link to the push broker.
#[async_trait]
pub trait TransportLink: Send {
    /// Send a text frame.
    async fn send_text(&mut self, text: &str) -> ChannelResult<()>;

    /// Receive the next text frame. `Ok(None)` means the peer closed the
    /// link cleanly.
    async fn next_text(&mut self) -> ChannelResult<Option<String>>;

    /// Close the link. Best effort; the link is unusable afterwards.
    async fn close(&mut self) -> ChannelResult<()>;
}

/// Establishes [`TransportLink`]s to a broker endpoint.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open a new link to `url`.
    async fn connect(&self, url: &Url) -> ChannelResult<Box<dyn TransportLink>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket transport
// ─────────────────────────────────────────────────────────────────────────────

/// Native WebSocket transport.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl WebSocketTransport {
    /// Create a transport with the given handshake timeout.
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl StreamTransport for WebSocketTransport {
    async fn connect(&self, url: &Url) -> ChannelResult<Box<dyn TransportLink>> {
        let (stream, response) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| ChannelError::timeout("websocket connect"))?
            .map_err(|e| ChannelError::connection_failed(format!("websocket connect: {e}")))?;

        tracing::debug!(status = %response.status(), %url, "websocket established");
        Ok(Box::new(WebSocketLink {
            stream,
            write_timeout: self.write_timeout,
        }))
    }
}

struct WebSocketLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    write_timeout: Duration,
}

#[async_trait]
impl TransportLink for WebSocketLink {
    async fn send_text(&mut self, text: &str) -> ChannelResult<()> {
        timeout(self.write_timeout, self.stream.send(Message::Text(text.to_string())))
            .await
            .map_err(|_| ChannelError::timeout("websocket send"))?
            .map_err(|e| ChannelError::send_failed(format!("websocket send: {e}")))
    }

    async fn next_text(&mut self) -> ChannelResult<Option<String>> {
        // Pushes can be arbitrarily far apart, so reads have no deadline.
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    return Err(ChannelError::connection_failed(format!(
                        "websocket receive: {e}"
                    )))
                }
                None => return Ok(None),
            };

            match message {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(data) => match String::from_utf8(data) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => tracing::warn!("ignoring non-utf8 binary frame"),
                },
                Message::Ping(data) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| ChannelError::send_failed(format!("websocket pong: {e}")))?;
                }
                Message::Pong(_) => {}
                Message::Close(_) => return Ok(None),
                Message::Frame(_) => {
                    return Err(ChannelError::connection_failed(
                        "unexpected raw websocket frame".to_string(),
                    ))
                }
            }
        }
    }

    async fn close(&mut self) -> ChannelResult<()> {
        let frame = Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "session ended".into(),
        }));
        self.stream
            .send(frame)
            .await
            .map_err(|e| ChannelError::connection_failed(format!("websocket close: {e}")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Long-polling transport
// ─────────────────────────────────────────────────────────────────────────────

/// Long-polling fallback transport.
///
/// Registers a link with the broker over plain HTTP, then polls for queued
/// frames on an interval. Outbound frames go out as individual POSTs.
pub struct LongPollTransport {
    client: reqwest::Client,
    poll_interval: Duration,
}

impl LongPollTransport {
    /// Create a transport polling at the given interval.
    pub fn new(poll_interval: Duration) -> ChannelResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ChannelError::connection_failed(format!("http client: {e}")))?;
        Ok(Self {
            client,
            poll_interval,
        })
    }
}

#[async_trait]
impl StreamTransport for LongPollTransport {
    async fn connect(&self, url: &Url) -> ChannelResult<Box<dyn TransportLink>> {
        let link_id = uuid::Uuid::new_v4().to_string();
        let register_url = format!("{url}/register/{link_id}");

        let response = self
            .client
            .post(&register_url)
            .send()
            .await
            .map_err(|e| ChannelError::connection_failed(format!("long-poll register: {e}")))?;
        if !response.status().is_success() {
            return Err(ChannelError::connection_failed(format!(
                "long-poll register rejected: {}",
                response.status()
            )));
        }

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let client = self.client.clone();
        let poll_url = format!("{url}/poll/{link_id}");
        let poll_interval = self.poll_interval;
        tokio::spawn(async move {
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }
                match poll_once(&client, &poll_url).await {
                    Ok(frames) => {
                        for frame in frames {
                            if inbox_tx.send(frame).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "long-poll cycle failed");
                    }
                }
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval) => {}
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        tracing::debug!(%link_id, "long-poll link registered");
        Ok(Box::new(LongPollLink {
            client: self.client.clone(),
            send_url: format!("{url}/send/{link_id}"),
            inbox: inbox_rx,
            shutdown: shutdown_tx,
        }))
    }
}

async fn poll_once(client: &reqwest::Client, poll_url: &str) -> ChannelResult<Vec<String>> {
    let response = client
        .get(poll_url)
        .send()
        .await
        .map_err(|e| ChannelError::connection_failed(format!("long-poll: {e}")))?;

    if !response.status().is_success() {
        tracing::debug!(status = %response.status(), "no frames queued");
        return Ok(Vec::new());
    }
    response
        .json::<Vec<String>>()
        .await
        .map_err(|e| ChannelError::connection_failed(format!("long-poll decode: {e}")))
}

struct LongPollLink {
    client: reqwest::Client,
    send_url: String,
    inbox: mpsc::UnboundedReceiver<String>,
    shutdown: watch::Sender<bool>,
}

#[async_trait]
impl TransportLink for LongPollLink {
    async fn send_text(&mut self, text: &str) -> ChannelResult<()> {
        let response = self
            .client
            .post(&self.send_url)
            .body(text.to_string())
            .send()
            .await
            .map_err(|e| ChannelError::send_failed(format!("long-poll send: {e}")))?;
        if !response.status().is_success() {
            return Err(ChannelError::send_failed(format!(
                "long-poll send rejected: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn next_text(&mut self) -> ChannelResult<Option<String>> {
        Ok(self.inbox.recv().await)
    }

    async fn close(&mut self) -> ChannelResult<()> {
        let _ = self.shutdown.send(true);
        Ok(())
    }
}
