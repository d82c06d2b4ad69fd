//! Raw tokio-tungstenite transport: one accept loop, one spawned worker
//! per TCP stream.

use crate::connection::{SinkAdapter, StreamAdapter};
use crate::message::{ClientMessage, ServerMessage};
use crate::relay::Relay;
use crate::utils::next_connection_id;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, WebSocketStream};
use tracing::warn;
use tungstenite::{Message, Utf8Bytes};

struct WsSink {
    sink: SplitSink<WebSocketStream<TcpStream>, Message>,
}

#[async_trait]
impl SinkAdapter for WsSink {
    async fn send(
        &mut self,
        message: ServerMessage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let message = Message::Text(Utf8Bytes::from(serde_json::to_string(&message)?));
        self.sink.send(message).await.map_err(|e| Box::new(e) as _)
    }
}

struct WsStream {
    stream: SplitStream<WebSocketStream<TcpStream>>,
}

#[async_trait]
impl StreamAdapter for WsStream {
    async fn next(
        &mut self,
    ) -> Result<ClientMessage, Box<dyn std::error::Error + Send + Sync>> {
        loop {
            let message = match self.stream.next().await {
                Some(message) => message?,
                None => {
                    return Err(Box::new(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "websocket closed",
                    )) as _)
                }
            };
            match message {
                Message::Text(text) => return Ok(serde_json::from_str(text.as_str())?),
                // Protocol-level keepalives, not ours to interpret.
                Message::Ping(_) | Message::Pong(_) => continue,
                _ => {
                    return Err(Box::new(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "non-text websocket message",
                    )) as _)
                }
            }
        }
    }
}

/// Websocket front for a [`Relay`]: binds a TCP listener and drives one
/// relay connection per accepted socket.
pub struct WebsocketRelay {
    relay: Arc<Relay>,
    tcp_listener: Option<TcpListener>,
}

impl WebsocketRelay {
    pub fn new() -> Self {
        WebsocketRelay {
            relay: Arc::new(Relay::new()),
            tcp_listener: None,
        }
    }

    /// Shared handle to the relay core, e.g. for registry inspection.
    pub fn relay(&self) -> Arc<Relay> {
        self.relay.clone()
    }

    pub fn bind_listener(&mut self, listener: TcpListener) {
        self.tcp_listener = Some(listener);
    }

    pub async fn bind_addr(&mut self, addr: &str) -> io::Result<()> {
        self.tcp_listener = Some(TcpListener::bind(addr).await?);
        Ok(())
    }

    /// Accept loop. Runs until the listener fails; a handshake failure on
    /// one socket only kills that socket's worker.
    pub async fn listen(&mut self) -> io::Result<()> {
        let Some(listener) = &self.tcp_listener else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no listener bound",
            ));
        };
        loop {
            let (stream, _) = listener.accept().await?;
            tokio::spawn(Self::stream_worker(stream, self.relay.clone()));
        }
    }

    async fn stream_worker(stream: TcpStream, relay: Arc<Relay>) {
        let websocket = match accept_async(stream).await {
            Ok(websocket) => websocket,
            Err(e) => {
                warn!("websocket handshake failed: {e}");
                return;
            }
        };
        let (sink, stream) = websocket.split();

        let connection = next_connection_id();
        let mut stream = WsStream { stream };
        let sink = WsSink { sink };

        relay.handle_stream(connection, &mut stream, sink).await;
    }
}

impl Default for WebsocketRelay {
    fn default() -> Self {
        Self::new()
    }
}
