//! Channel lifecycle and per-user subscription.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use punchcard_core::{points_topic, PointsPush};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{ChannelError, ChannelResult};
use crate::transport::{StreamTransport, TransportLink};
use crate::wire::{ClientFrame, ServerFrame};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// No transport active.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Transport up, subscription not yet placed.
    Connected,
    /// Subscribed to the user's topic and receiving frames.
    SubscriptionActive,
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Broker endpoint: `ws://…` for the streaming transport, `http://…`
    /// for the long-polling fallback.
    pub url: String,

    /// Handshake timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Poll cadence for the long-polling fallback, in milliseconds.
    pub poll_interval_millis: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_string(),
            connect_timeout_secs: 10,
            poll_interval_millis: 1000,
        }
    }
}

impl ChannelConfig {
    /// Handshake timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Long-poll cadence as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }
}

/// Consumer callback invoked with every recognized balance push.
pub type BalanceSink = Arc<dyn Fn(i64) + Send + Sync>;

/// The realtime balance channel.
///
/// One instance per session. `connect` is idempotent while a connection is
/// up; `disconnect` is a no-op when already down. There is no automatic
/// reconnection.
pub struct RealtimeChannel {
    config: ChannelConfig,
    transport: Arc<dyn StreamTransport>,
    on_balance: BalanceSink,
    status: Arc<RwLock<ChannelStatus>>,
    subscribed_user_id: Arc<RwLock<Option<i64>>>,
    // Serializes connect/disconnect and owns the reader task.
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Default)]
struct Lifecycle {
    shutdown: Option<watch::Sender<bool>>,
    reader: Option<JoinHandle<()>>,
}

impl RealtimeChannel {
    /// Create a channel that forwards recognized pushes into `on_balance`.
    pub fn new(
        config: ChannelConfig,
        transport: Arc<dyn StreamTransport>,
        on_balance: impl Fn(i64) + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            transport,
            on_balance: Arc::new(on_balance),
            status: Arc::new(RwLock::new(ChannelStatus::Disconnected)),
            subscribed_user_id: Arc::new(RwLock::new(None)),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ChannelStatus {
        *self.status.read()
    }

    /// The user whose topic is currently subscribed, if any.
    pub fn subscribed_user_id(&self) -> Option<i64> {
        *self.subscribed_user_id.read()
    }

    /// Connect and subscribe to `user_id`'s balance topic.
    ///
    /// A no-op when already connected or subscribed.
    pub async fn connect(&self, user_id: i64) -> ChannelResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if matches!(
            self.status(),
            ChannelStatus::Connected | ChannelStatus::SubscriptionActive
        ) {
            tracing::debug!("channel already connected");
            return Ok(());
        }

        let url = Url::parse(&self.config.url)
            .map_err(|e| ChannelError::connection_failed(format!("broker url: {e}")))?;
        self.set_status(ChannelStatus::Connecting);

        let mut link = match self.transport.connect(&url).await {
            Ok(link) => link,
            Err(e) => {
                self.set_status(ChannelStatus::Disconnected);
                return Err(e);
            }
        };
        self.set_status(ChannelStatus::Connected);

        // Subscription is placed immediately after the handshake; only
        // frames on this topic are accepted.
        let topic = points_topic(user_id);
        let subscribe = ClientFrame::Subscribe {
            topic: topic.clone(),
        };
        let frame = serde_json::to_string(&subscribe)
            .map_err(|e| ChannelError::send_failed(format!("encode subscribe: {e}")))?;
        if let Err(e) = link.send_text(&frame).await {
            let _ = link.close().await;
            self.set_status(ChannelStatus::Disconnected);
            return Err(e);
        }

        *self.subscribed_user_id.write() = Some(user_id);
        self.set_status(ChannelStatus::SubscriptionActive);
        tracing::info!(user_id, %topic, "subscribed to balance updates");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        lifecycle.shutdown = Some(shutdown_tx);
        lifecycle.reader = Some(tokio::spawn(read_loop(
            link,
            topic,
            self.status.clone(),
            self.on_balance.clone(),
            shutdown_rx,
        )));
        Ok(())
    }

    /// Tear the connection down.
    ///
    /// A no-op when already disconnected. After this returns, the reader
    /// task has exited and no further pushes will be delivered.
    pub async fn disconnect(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(shutdown) = lifecycle.shutdown.take() else {
            tracing::debug!("channel already disconnected");
            return;
        };
        let _ = shutdown.send(true);
        if let Some(reader) = lifecycle.reader.take() {
            let _ = reader.await;
        }
        *self.subscribed_user_id.write() = None;
        self.set_status(ChannelStatus::Disconnected);
        tracing::info!("channel disconnected");
    }

    fn set_status(&self, status: ChannelStatus) {
        *self.status.write() = status;
    }
}

async fn read_loop(
    mut link: Box<dyn TransportLink>,
    topic: String,
    status: Arc<RwLock<ChannelStatus>>,
    on_balance: BalanceSink,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                let _ = link.close().await;
                break;
            }
            received = link.next_text() => match received {
                Ok(Some(text)) => handle_frame(&text, &topic, &on_balance),
                Ok(None) => {
                    tracing::warn!("channel closed by peer");
                    *status.write() = ChannelStatus::Disconnected;
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "channel transport error");
                    *status.write() = ChannelStatus::Disconnected;
                    break;
                }
            }
        }
    }
}

fn handle_frame(text: &str, topic: &str, on_balance: &BalanceSink) {
    let frame: ServerFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "discarding undecodable frame");
            return;
        }
    };
    if frame.topic != topic {
        tracing::debug!(topic = %frame.topic, "ignoring frame for another topic");
        return;
    }
    match PointsPush::from_value(&frame.body) {
        PointsPush::Recognized(balance) => {
            tracing::debug!(balance, "balance push received");
            (on_balance)(balance);
        }
        PointsPush::Unrecognized => {
            tracing::warn!("discarding push with unrecognized body");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct FakeLink {
        sent: Arc<SyncMutex<Vec<String>>>,
        inbox: mpsc::UnboundedReceiver<String>,
    }

    #[async_trait]
    impl TransportLink for FakeLink {
        async fn send_text(&mut self, text: &str) -> ChannelResult<()> {
            self.sent.lock().push(text.to_string());
            Ok(())
        }

        async fn next_text(&mut self) -> ChannelResult<Option<String>> {
            Ok(self.inbox.recv().await)
        }

        async fn close(&mut self) -> ChannelResult<()> {
            self.inbox.close();
            Ok(())
        }
    }

    struct FakeTransport {
        connects: AtomicUsize,
        sent: Arc<SyncMutex<Vec<String>>>,
        links: SyncMutex<Vec<mpsc::UnboundedReceiver<String>>>,
    }

    impl FakeTransport {
        /// Returns the transport plus one inbound frame sender per link it
        /// will hand out.
        fn with_links(count: usize) -> (Arc<Self>, Vec<mpsc::UnboundedSender<String>>) {
            let mut senders = Vec::new();
            let mut receivers = Vec::new();
            for _ in 0..count {
                let (tx, rx) = mpsc::unbounded_channel();
                senders.push(tx);
                receivers.push(rx);
            }
            let transport = Arc::new(Self {
                connects: AtomicUsize::new(0),
                sent: Arc::new(SyncMutex::new(Vec::new())),
                links: SyncMutex::new(receivers),
            });
            (transport, senders)
        }
    }

    #[async_trait]
    impl StreamTransport for FakeTransport {
        async fn connect(&self, _url: &Url) -> ChannelResult<Box<dyn TransportLink>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let inbox = self
                .links
                .lock()
                .pop()
                .ok_or_else(|| ChannelError::connection_failed("no link available"))?;
            Ok(Box::new(FakeLink {
                sent: self.sent.clone(),
                inbox,
            }))
        }
    }

    fn channel_with(
        transport: Arc<FakeTransport>,
    ) -> (RealtimeChannel, Arc<SyncMutex<Vec<i64>>>) {
        let received = Arc::new(SyncMutex::new(Vec::new()));
        let sink = received.clone();
        let channel = RealtimeChannel::new(ChannelConfig::default(), transport, move |balance| {
            sink.lock().push(balance);
        });
        (channel, received)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn connect_twice_places_one_subscription() {
        let (transport, _senders) = FakeTransport::with_links(1);
        let (channel, _) = channel_with(transport.clone());

        channel.connect(42).await.unwrap();
        channel.connect(42).await.unwrap();

        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
        assert_eq!(
            *transport.sent.lock(),
            [r#"{"type":"subscribe","topic":"points/42"}"#]
        );
        assert_eq!(channel.status(), ChannelStatus::SubscriptionActive);
        assert_eq!(channel.subscribed_user_id(), Some(42));
        channel.disconnect().await;
    }

    #[tokio::test]
    async fn recognized_pushes_are_forwarded_in_order() {
        let (transport, senders) = FakeTransport::with_links(1);
        let (channel, received) = channel_with(transport);

        channel.connect(42).await.unwrap();
        for (frame, value) in [
            (r#"{"topic":"points/42","body":{"pointsBalance":90}}"#, 90),
            (r#"{"topic":"points/42","body":{"balance":70}}"#, 70),
        ] {
            senders[0].send(frame.to_string()).unwrap();
            let want = value;
            wait_until(|| received.lock().last() == Some(&want)).await;
        }
        assert_eq!(*received.lock(), [90, 70]);
        channel.disconnect().await;
    }

    #[tokio::test]
    async fn malformed_and_foreign_frames_are_discarded() {
        let (transport, senders) = FakeTransport::with_links(1);
        let (channel, received) = channel_with(transport);

        channel.connect(42).await.unwrap();
        senders[0].send("not json".to_string()).unwrap();
        senders[0]
            .send(r#"{"topic":"points/99","body":{"balance":1}}"#.to_string())
            .unwrap();
        senders[0]
            .send(r#"{"topic":"points/42","body":{"unrelated":true}}"#.to_string())
            .unwrap();
        senders[0]
            .send(r#"{"topic":"points/42","body":{"balance":5}}"#.to_string())
            .unwrap();

        wait_until(|| !received.lock().is_empty()).await;
        // Only the final, recognized frame made it through, and the channel
        // never dropped.
        assert_eq!(*received.lock(), [5]);
        assert_eq!(channel.status(), ChannelStatus::SubscriptionActive);
        channel.disconnect().await;
    }

    #[tokio::test]
    async fn peer_close_parks_channel_disconnected() {
        let (transport, senders) = FakeTransport::with_links(1);
        let (channel, _) = channel_with(transport);

        channel.connect(42).await.unwrap();
        drop(senders);
        wait_until(|| channel.status() == ChannelStatus::Disconnected).await;
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_complete() {
        let (transport, _senders) = FakeTransport::with_links(2);
        let (channel, _) = channel_with(transport.clone());

        // Disconnecting before any connect is a no-op.
        channel.disconnect().await;
        assert_eq!(channel.status(), ChannelStatus::Disconnected);

        channel.connect(42).await.unwrap();
        channel.disconnect().await;
        assert_eq!(channel.status(), ChannelStatus::Disconnected);
        assert_eq!(channel.subscribed_user_id(), None);
        channel.disconnect().await;

        // A fresh connect after teardown opens a new link.
        channel.connect(42).await.unwrap();
        assert_eq!(transport.connects.load(Ordering::SeqCst), 2);
        channel.disconnect().await;
    }

    #[tokio::test]
    async fn failed_connect_leaves_channel_disconnected() {
        let (transport, _senders) = FakeTransport::with_links(0);
        let (channel, _) = channel_with(transport);

        let result = channel.connect(42).await;
        assert!(result.is_err());
        assert_eq!(channel.status(), ChannelStatus::Disconnected);
        assert_eq!(channel.subscribed_user_id(), None);
    }
}
