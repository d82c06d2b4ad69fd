//! Wire protocol: identifiers and the tagged message enums exchanged
//! between clients and the relay.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Room id a client lands in when its join request carries none.
pub const DEFAULT_ROOM: &str = "default-room";

/// Transport-assigned id of one live connection.
///
/// Ephemeral: a reconnect gets a fresh one. Exactly one connection may hold
/// a given id at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Client-generated durable identity token.
///
/// Persisted by the client and re-presented on every reconnect, so peers
/// can key their render tiles on it instead of the transient connection id.
/// Opaque to the server; uniqueness is not enforced (two devices presenting
/// the same token end up merged into one tile on every peer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a broadcast domain. Rooms appear on first join and vanish with
/// their last member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_room() -> RoomId {
    RoomId(DEFAULT_ROOM.to_string())
}

/// Which capture source a frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Screen,
}

/// One room member as seen by its peers: the transient connection plus the
/// durable identity behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub connection: ConnectionId,
    pub user: UserId,
}

/// Messages a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Register in a room under a durable identity. Joining a room the
    /// connection is already in is idempotent.
    Join {
        #[serde(default = "default_room")]
        room: RoomId,
        user: UserId,
    },
    /// One encoded image. The payload is relayed verbatim, never validated.
    Frame { kind: MediaKind, payload: Vec<u8> },
    /// Microphone state changed; pure UI broadcast, no registry effect.
    ToggleAudio { enabled: bool },
    /// Camera state changed; pure UI broadcast, no registry effect.
    ToggleVideo { enabled: bool },
    StartScreenShare,
    StopScreenShare,
}

/// Messages the relay sends to clients, each stamped with the sender where
/// one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// Reply to a join: everyone already in the room, excluding the joiner.
    ExistingUsers(Vec<Member>),
    /// A new member registered in a room this connection is in.
    UserJoined(Member),
    /// A member's transport went away.
    ParticipantLeft(Member),
    Frame {
        sender: Member,
        kind: MediaKind,
        payload: Vec<u8>,
    },
    ToggleAudio { sender: Member, enabled: bool },
    ToggleVideo { sender: Member, enabled: bool },
    ScreenShareStarted { sender: Member },
    ScreenShareStopped { sender: Member },
}
