//! Relay core: one task per connection, fan-out per room.
//!
//! Each connection runs [`Relay::handle_stream`] for its whole life. The
//! membership state machine per connection is Connected until a join
//! registers it, then Joined until the transport drops. Frames and
//! signaling events from a connection that has not joined yet are dropped
//! silently; there is no room to route them to.
pub mod axum;
mod test;
pub mod ws;

use crate::connection::{SinkAdapter, StreamAdapter};
use crate::message::{ClientMessage, ConnectionId, Member, RoomId, ServerMessage, UserId};
use crate::registry::RoomRegistry;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info};

type PeerMap = HashMap<ConnectionId, UnboundedSender<ServerMessage>>;

/// Shared relay state: the room registry plus one outbound queue per live
/// connection. Sends only ever enqueue; the per-connection writer task
/// drains the queue into the transport, so no lock is held across network
/// I/O and a slow peer cannot stall anyone else.
pub struct Relay {
    registry: RoomRegistry,
    peers: RwLock<PeerMap>,
}

impl Relay {
    pub fn new() -> Self {
        Relay {
            registry: RoomRegistry::new(),
            peers: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    fn peers_read(&self) -> RwLockReadGuard<'_, PeerMap> {
        self.peers.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn peers_write(&self) -> RwLockWriteGuard<'_, PeerMap> {
        self.peers.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drives one connection from transport-established to disconnected.
    ///
    /// Returns when the stream ends or errors; by then the connection has
    /// been removed from every room and its peers notified.
    pub async fn handle_stream<S>(
        &self,
        connection: ConnectionId,
        stream: &mut (impl StreamAdapter + Send),
        sink: S,
    ) where
        S: SinkAdapter + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
        self.peers_write().insert(connection, tx);
        info!(%connection, "connection established");

        let writer = tokio::spawn(async move {
            let mut sink = sink;
            while let Some(message) = rx.recv().await {
                if sink.send(message).await.is_err() {
                    // Transport already half-closed; at-most-once delivery
                    // means whatever is still queued just vanishes.
                    break;
                }
            }
        });

        // None until the join handshake completes.
        let mut joined_as: Option<UserId> = None;

        while let Ok(message) = stream.next().await {
            match message {
                ClientMessage::Join { room, user } => {
                    self.handle_join(connection, room, user.clone());
                    joined_as = Some(user);
                }
                ClientMessage::Frame { kind, payload } => match &joined_as {
                    Some(user) => self.broadcast_from(connection, user, |sender| {
                        ServerMessage::Frame {
                            sender,
                            kind,
                            payload: payload.clone(),
                        }
                    }),
                    None => debug!(%connection, "frame before join dropped"),
                },
                ClientMessage::ToggleAudio { enabled } => match &joined_as {
                    Some(user) => self.broadcast_from(connection, user, |sender| {
                        ServerMessage::ToggleAudio { sender, enabled }
                    }),
                    None => debug!(%connection, "toggle before join dropped"),
                },
                ClientMessage::ToggleVideo { enabled } => match &joined_as {
                    Some(user) => self.broadcast_from(connection, user, |sender| {
                        ServerMessage::ToggleVideo { sender, enabled }
                    }),
                    None => debug!(%connection, "toggle before join dropped"),
                },
                ClientMessage::StartScreenShare => match &joined_as {
                    Some(user) => self.broadcast_from(connection, user, |sender| {
                        ServerMessage::ScreenShareStarted { sender }
                    }),
                    None => debug!(%connection, "screen-share signal before join dropped"),
                },
                ClientMessage::StopScreenShare => match &joined_as {
                    Some(user) => self.broadcast_from(connection, user, |sender| {
                        ServerMessage::ScreenShareStopped { sender }
                    }),
                    None => debug!(%connection, "screen-share signal before join dropped"),
                },
            }
        }

        self.disconnect(connection);
        let _ = writer.await;
    }

    /// Join handshake: register, reply with the existing members, and
    /// notify them. A repeat join re-delivers `ExistingUsers` but notifies
    /// no one.
    fn handle_join(&self, connection: ConnectionId, room: RoomId, user: UserId) {
        let outcome = self.registry.join(connection, room.clone(), user.clone());
        info!(%connection, %room, %user, rejoin = !outcome.newly_joined, "join");

        self.send_to(connection, ServerMessage::ExistingUsers(outcome.peers.clone()));

        if outcome.newly_joined {
            let member = Member { connection, user };
            for peer in outcome.peers {
                self.send_to(peer.connection, ServerMessage::UserJoined(member.clone()));
            }
        }
    }

    /// Fans one event out to every other member of every room the sender is
    /// in, stamped with the sender's connection and durable identity.
    fn broadcast_from(
        &self,
        connection: ConnectionId,
        user: &UserId,
        build: impl Fn(Member) -> ServerMessage,
    ) {
        let sender = Member {
            connection,
            user: user.clone(),
        };
        for room in self.registry.rooms_of(connection) {
            for peer in self.registry.members_of(&room) {
                if peer.connection == connection {
                    continue;
                }
                self.send_to(peer.connection, build(sender.clone()));
            }
        }
    }

    /// Enqueues for one peer. A missing or closed queue means the peer is
    /// gone; the message is dropped without retry or buffering.
    fn send_to(&self, connection: ConnectionId, message: ServerMessage) {
        let peers = self.peers_read();
        if let Some(tx) = peers.get(&connection) {
            if tx.send(message).is_err() {
                debug!(%connection, "peer queue closed, message dropped");
            }
        }
    }

    /// Transport loss: remove from every room and tell each room's
    /// remaining members exactly once.
    fn disconnect(&self, connection: ConnectionId) {
        self.peers_write().remove(&connection);

        for (room, user) in self.registry.leave(connection) {
            info!(%connection, %room, %user, "participant left");
            let departed = Member { connection, user };
            for peer in self.registry.members_of(&room) {
                self.send_to(peer.connection, ServerMessage::ParticipantLeft(departed.clone()));
            }
        }
        info!(%connection, "connection closed");
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}
