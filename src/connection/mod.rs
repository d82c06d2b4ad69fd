//! Transport adapter seam. The relay core only ever talks to these two
//! traits; tokio-tungstenite and axum implementations live under
//! [`crate::relay`].
use crate::message::{ClientMessage, ServerMessage};
use async_trait::async_trait;

/// Outbound half of one connection.
#[async_trait]
pub trait SinkAdapter {
    async fn send(
        &mut self,
        message: ServerMessage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Inbound half of one connection. An error from `next` means the transport
/// is gone and the connection moves to its disconnected state.
#[async_trait]
pub trait StreamAdapter {
    async fn next(&mut self)
        -> Result<ClientMessage, Box<dyn std::error::Error + Send + Sync>>;
}
