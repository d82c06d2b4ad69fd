//! Axum mount: the same relay core behind an `axum::Router` route, for
//! embedding next to regular HTTP handlers.

use crate::connection::{SinkAdapter, StreamAdapter};
use crate::message::{ClientMessage, ServerMessage};
use crate::relay::Relay;
use crate::utils::next_connection_id;
use async_trait::async_trait;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::WebSocketUpgrade;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io;

pub struct AxumWsSink {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl SinkAdapter for AxumWsSink {
    async fn send(
        &mut self,
        message: ServerMessage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let message = Message::Text(Utf8Bytes::from(serde_json::to_string(&message)?));
        self.sink.send(message).await.map_err(|e| Box::new(e) as _)
    }
}

pub struct AxumWsStream {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl StreamAdapter for AxumWsStream {
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

/// Mounts a [`Relay`] on an axum router.
pub struct AxumWsRelay {
    relay: Arc<Relay>,
}

impl AxumWsRelay {
    pub fn new() -> Self {
        AxumWsRelay {
            relay: Arc::new(Relay::new()),
        }
    }

    pub fn relay(&self) -> Arc<Relay> {
        self.relay.clone()
    }

    async fn ws_handler(ws: WebSocketUpgrade, relay: Arc<Relay>) -> impl IntoResponse {
        ws.on_upgrade(|socket| async move {
            let (sink, stream) = socket.split();

            let connection = next_connection_id();
            let mut stream = AxumWsStream { stream };
            let sink = AxumWsSink { sink };

            relay.handle_stream(connection, &mut stream, sink).await;
        })
    }

    /// Adds the relay's websocket endpoint at `path`.
    pub fn attach_router(&self, path: &str, router: Router) -> Router {
        let relay = self.relay.clone();
        router.route(path, get(move |ws| Self::ws_handler(ws, relay)))
    }
}

impl Default for AxumWsRelay {
    fn default() -> Self {
        Self::new()
    }
}
