//! Transport boundary between a session and its peer.
//!
//! Receives resolve to an [`Inbound`] value rather than an error path, so the
//! session loop sees disconnects as ordinary data. `Idle` only means nothing
//! arrived within the allowed wait.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("send failed: {0}")]
    Send(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message(String),
    Idle,
    Closed,
    Error(TransportError),
}

#[async_trait]
pub trait Transport: Send {
    /// Wait at most `wait` for the next inbound text message.
    /// A zero wait polls once without blocking.
    async fn recv_within(&mut self, wait: Duration) -> Inbound;

    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
}

/// Axum websocket adapter.
pub struct WebSocketTransport {
    socket: WebSocket,
}

impl WebSocketTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn recv_within(&mut self, wait: Duration) -> Inbound {
        let deadline = Instant::now() + wait;
        loop {
            let next = match timeout_at(deadline, self.socket.recv()).await {
                Err(_) => return Inbound::Idle,
                Ok(next) => next,
            };
            match next {
                None => return Inbound::Closed,
                Some(Err(e)) => return Inbound::Error(TransportError::Receive(e.to_string())),
                Some(Ok(Message::Text(text))) => return Inbound::Message(text.as_str().to_owned()),
                Some(Ok(Message::Binary(bytes))) => {
                    return Inbound::Message(String::from_utf8_lossy(&bytes).into_owned())
                }
                Some(Ok(Message::Close(_))) => return Inbound::Closed,
                // control frames are answered by the socket itself
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// In-memory transport over unbounded channels.
/// Dropping the peer's sender reads as a close.
pub struct ChannelTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

/// The other end of a [`ChannelTransport`].
pub struct ChannelPeer {
    pub to_session: mpsc::UnboundedSender<String>,
    pub from_session: mpsc::UnboundedReceiver<String>,
}

impl ChannelTransport {
    pub fn pair() -> (ChannelTransport, ChannelPeer) {
        let (to_session, inbound) = mpsc::unbounded_channel();
        let (outbound, from_session) = mpsc::unbounded_channel();
        (
            ChannelTransport { inbound, outbound },
            ChannelPeer {
                to_session,
                from_session,
            },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn recv_within(&mut self, wait: Duration) -> Inbound {
        match timeout(wait, self.inbound.recv()).await {
            Err(_) => Inbound::Idle,
            Ok(Some(text)) => Inbound::Message(text),
            Ok(None) => Inbound::Closed,
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(text)
            .map_err(|_| TransportError::Send("peer dropped".to_string()))
    }
}
