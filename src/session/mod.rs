//! Client-side session state: keeps the rendered tile set, keyed by
//! durable user id, consistent with what the relay reports.

use crate::message::{MediaKind, ServerMessage, UserId};
use crate::pipeline::TransmitRate;
use std::collections::HashSet;
use tracing::debug;

/// Sink for everything the session wants drawn; the DOM/GUI boundary.
pub trait RenderBoundary {
    fn upsert_tile(&mut self, user: &UserId);
    fn remove_tile(&mut self, user: &UserId);
    fn paint(&mut self, user: &UserId, kind: MediaKind, payload: &[u8]);
    fn report_stats(&mut self, stats: &str);
}

/// Applies relay messages to a tile set.
///
/// A tile for user X exists exactly when a join notification or frame for X
/// has been seen with no later leave. Tiles are keyed by durable user id,
/// so a participant who reconnects lands back in the same tile instead of
/// growing a second one.
pub struct ClientSession {
    local_user: UserId,
    tiles: HashSet<UserId>,
}

impl ClientSession {
    pub fn new(local_user: UserId) -> Self {
        ClientSession {
            local_user,
            tiles: HashSet::new(),
        }
    }

    pub fn local_user(&self) -> &UserId {
        &self.local_user
    }

    pub fn tiles(&self) -> &HashSet<UserId> {
        &self.tiles
    }

    /// Handles one message from the relay, updating tiles through the
    /// render boundary.
    pub fn apply<R: RenderBoundary>(&mut self, message: ServerMessage, render: &mut R) {
        match message {
            ServerMessage::ExistingUsers(members) => {
                for member in members {
                    self.upsert(member.user, render);
                }
            }
            ServerMessage::UserJoined(member) => self.upsert(member.user, render),
            ServerMessage::ParticipantLeft(member) => {
                if self.tiles.remove(&member.user) {
                    render.remove_tile(&member.user);
                }
            }
            ServerMessage::Frame {
                sender,
                kind,
                payload,
            } => {
                if sender.user == self.local_user {
                    // Our own frame echoed through another connection that
                    // happens to share the token; never paint ourselves.
                    return;
                }
                self.upsert(sender.user.clone(), render);
                render.paint(&sender.user, kind, &payload);
            }
            ServerMessage::ToggleAudio { sender, enabled } => {
                debug!(user = %sender.user, enabled, "peer toggled audio");
            }
            ServerMessage::ToggleVideo { sender, enabled } => {
                debug!(user = %sender.user, enabled, "peer toggled video");
            }
            ServerMessage::ScreenShareStarted { sender } => {
                debug!(user = %sender.user, "peer started screen share");
            }
            ServerMessage::ScreenShareStopped { sender } => {
                debug!(user = %sender.user, "peer stopped screen share");
            }
        }
    }

    /// Surfaces a transmission-rate statistic to the render boundary.
    pub fn publish_stats<R: RenderBoundary>(&self, rate: TransmitRate, render: &mut R) {
        render.report_stats(&rate.to_string());
    }

    fn upsert<R: RenderBoundary>(&mut self, user: UserId, render: &mut R) {
        if self.tiles.insert(user.clone()) {
            render.upsert_tile(&user);
        }
    }
}
