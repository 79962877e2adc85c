//! Event-stream socket transport
//!
//! The sync client only needs to open a socket, send and receive text
//! frames, and close it. `WsTransport` implements that over
//! `tokio-tungstenite`; tests substitute an in-memory transport.

use crate::error::{EmoteError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Opens event-stream sockets
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Open a socket to `url`, completing once the handshake is done
    async fn open(&self, url: &str) -> Result<Box<dyn EventSocket>>;
}

/// One open event-stream socket
#[async_trait]
pub trait EventSocket: Send {
    /// Send one text frame
    async fn send(&mut self, text: String) -> Result<()>;

    /// Receive the next text frame
    ///
    /// `None` means the peer closed the stream; `Some(Err(_))` is a socket
    /// failure. Non-text frames are handled internally and never surface.
    async fn recv(&mut self) -> Option<Result<String>>;

    /// Close the socket; closing twice is not an error
    async fn close(&mut self) -> Result<()>;
}

/// WebSocket transport backed by `tokio-tungstenite`
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventTransport for WsTransport {
    async fn open(&self, url: &str) -> Result<Box<dyn EventSocket>> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| EmoteError::Connection(format!("{}: {}", url, e)))?;

        tracing::debug!(url, status = %response.status(), "WebSocket handshake complete");

        Ok(Box::new(WsSocket { stream }))
    }
}

struct WsSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl EventSocket for WsSocket {
    async fn send(&mut self, text: String) -> Result<()> {
        match self.stream.send(Message::Text(text)).await {
            Ok(()) => Ok(()),
            Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Err(EmoteError::Closed),
            Err(e) => Err(EmoteError::Connection(format!("send failed: {}", e))),
        }
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "WebSocket close frame received");
                    return None;
                }
                // Pings are answered by tungstenite on the next read/write
                Ok(_) => continue,
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => return None,
                Err(e) => {
                    return Some(Err(EmoteError::Connection(format!(
                        "receive failed: {}",
                        e
                    ))))
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(EmoteError::Connection(format!("close failed: {}", e))),
        }
    }
}
