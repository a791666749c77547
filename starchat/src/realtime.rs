//! Push-subscription seam and its implementations.
//!
//! A [`RealtimeProvider`] hands out one [`RoomChannel`] per
//! subscription. The provider delivers schema-wide insert events, not
//! filtered by room, so consumers must filter by `chat_id` at
//! ingestion. Delivery is weakly ordered with no replay: a message
//! inserted while no channel is open is simply never pushed.
//!
//! [`WsRealtime`] is the WebSocket implementation; [`LoopbackHub`] is
//! the in-process implementation used by the in-memory backend and the
//! integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::{SinkExt, StreamExt};
use starchat_proto::message::Message;
use starchat_proto::wire::InsertEvent;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

/// Error opening a subscription channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// The connection to the realtime endpoint failed.
    #[error("realtime connect failed: {0}")]
    Connect(String),
    /// The connection opened but the subscribe frame was not accepted.
    #[error("subscribe failed: {0}")]
    Subscribe(String),
}

/// Source of per-room subscription channels.
pub trait RealtimeProvider: Send + Sync {
    /// The channel type this provider hands out.
    type Channel: RoomChannel + 'static;

    /// Opens a subscription on the named channel.
    fn subscribe(
        &self,
        channel: &str,
    ) -> impl std::future::Future<Output = Result<Self::Channel, FeedError>> + Send;
}

/// An open subscription delivering message insert events.
pub trait RoomChannel: Send {
    /// The next insert event, or `None` once the channel is closed.
    fn next_event(&mut self) -> impl std::future::Future<Output = Option<Message>> + Send;

    /// Closes the subscription.
    fn unsubscribe(self) -> impl std::future::Future<Output = ()> + Send;
}

/// WebSocket realtime provider.
///
/// Each subscription is its own connection carrying JSON
/// subscribe/leave frames and [`InsertEvent`] payloads.
#[derive(Debug, Clone)]
pub struct WsRealtime {
    endpoint: Url,
}

impl WsRealtime {
    #[must_use]
    pub const fn new(endpoint: Url) -> Self {
        Self { endpoint }
    }
}

impl RealtimeProvider for WsRealtime {
    type Channel = WsChannel;

    async fn subscribe(&self, channel: &str) -> Result<WsChannel, FeedError> {
        let (mut ws, _) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|err| FeedError::Connect(err.to_string()))?;
        let frame = serde_json::json!({ "action": "subscribe", "channel": channel }).to_string();
        ws.send(WsMessage::text(frame))
            .await
            .map_err(|err| FeedError::Subscribe(err.to_string()))?;
        tracing::debug!(channel, "realtime channel opened");
        Ok(WsChannel {
            ws,
            channel: channel.to_string(),
        })
    }
}

/// A live WebSocket subscription.
pub struct WsChannel {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    channel: String,
}

impl RoomChannel for WsChannel {
    async fn next_event(&mut self) -> Option<Message> {
        loop {
            match self.ws.next().await? {
                Ok(WsMessage::Text(payload)) => {
                    match serde_json::from_str::<InsertEvent>(payload.as_str()) {
                        Ok(event) if event.is_insert() => return Some(event.record),
                        Ok(_) => {}
                        Err(err) => {
                            tracing::warn!(error = %err, "unparseable realtime frame");
                        }
                    }
                }
                Ok(WsMessage::Close(_)) => return None,
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, channel = %self.channel, "realtime stream error");
                    return None;
                }
            }
        }
    }

    async fn unsubscribe(mut self) {
        let frame =
            serde_json::json!({ "action": "leave", "channel": self.channel }).to_string();
        if let Err(err) = self.ws.send(WsMessage::text(frame)).await {
            tracing::debug!(error = %err, "leave frame not delivered");
        }
        let _ = self.ws.close(None).await;
        tracing::debug!(channel = %self.channel, "realtime channel closed");
    }
}

/// In-process realtime provider.
///
/// Every published message is broadcast to every open channel,
/// mirroring the schema-wide delivery of the real provider. The open
/// channel count is observable so tests can assert the at-most-one
/// subscription invariant.
#[derive(Debug, Clone)]
pub struct LoopbackHub {
    tx: broadcast::Sender<Message>,
    open: Arc<AtomicUsize>,
}

impl LoopbackHub {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            tx,
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Broadcasts an insert event to every open channel.
    pub fn publish(&self, message: Message) {
        // No receivers is fine; delivery is best effort.
        let _ = self.tx.send(message);
    }

    /// Number of currently open channels.
    #[must_use]
    pub fn open_channels(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

impl Default for LoopbackHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeProvider for LoopbackHub {
    type Channel = LoopbackChannel;

    async fn subscribe(&self, channel: &str) -> Result<LoopbackChannel, FeedError> {
        tracing::debug!(channel, "loopback channel opened");
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(LoopbackChannel {
            rx: self.tx.subscribe(),
            open: Arc::clone(&self.open),
        })
    }
}

/// A live loopback subscription.
pub struct LoopbackChannel {
    rx: broadcast::Receiver<Message>,
    open: Arc<AtomicUsize>,
}

impl RoomChannel for LoopbackChannel {
    async fn next_event(&mut self) -> Option<Message> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "loopback channel lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    async fn unsubscribe(self) {}
}

impl Drop for LoopbackChannel {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}
