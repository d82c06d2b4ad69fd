//! Source of truth for room membership. One instance is built at process
//! start and handed to every connection task; there are no ambient globals.

use crate::message::{ConnectionId, Member, RoomId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// What [`RoomRegistry::join`] found.
#[derive(Debug)]
pub struct JoinOutcome {
    /// Everyone already in the room, excluding the joiner.
    pub peers: Vec<Member>,
    /// False when the connection was already registered in that room; the
    /// caller then re-delivers the peer list but must not notify anyone.
    pub newly_joined: bool,
}

#[derive(Default)]
struct RegistryInner {
    rooms: HashMap<RoomId, HashMap<ConnectionId, UserId>>,
    memberships: HashMap<ConnectionId, HashSet<RoomId>>,
}

/// Concurrency-safe room/membership map.
///
/// Every accessor returns owned copies, never references into the live
/// maps, so callers can iterate a snapshot while other connections mutate.
/// Absence of a room or connection is an empty result, not an error, and
/// nothing here performs I/O while the lock is held.
pub struct RoomRegistry {
    inner: RwLock<RegistryInner>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        RoomRegistry {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `connection` in `room` under `user`, creating the room on
    /// first join. Idempotent: a repeat join keeps the original entry.
    pub fn join(&self, connection: ConnectionId, room: RoomId, user: UserId) -> JoinOutcome {
        let mut inner = self.write();

        let members = inner.rooms.entry(room.clone()).or_default();
        let newly_joined = !members.contains_key(&connection);
        if newly_joined {
            members.insert(connection, user);
        }
        let peers = members
            .iter()
            .filter(|(id, _)| **id != connection)
            .map(|(id, user)| Member {
                connection: *id,
                user: user.clone(),
            })
            .collect();

        inner.memberships.entry(connection).or_default().insert(room);

        JoinOutcome { peers, newly_joined }
    }

    /// Rooms the connection currently belongs to, as an owned copy.
    pub fn rooms_of(&self, connection: ConnectionId) -> Vec<RoomId> {
        self.read()
            .memberships
            .get(&connection)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of a room's full member set, for fan-out outside the lock.
    pub fn members_of(&self, room: &RoomId) -> Vec<Member> {
        self.read()
            .rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .map(|(id, user)| Member {
                        connection: *id,
                        user: user.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Removes the connection from every room it was in and returns what
    /// was removed. A room left empty disappears with it.
    pub fn leave(&self, connection: ConnectionId) -> Vec<(RoomId, UserId)> {
        let mut inner = self.write();

        let rooms = inner.memberships.remove(&connection).unwrap_or_default();
        let mut departed = Vec::with_capacity(rooms.len());
        for room in rooms {
            if let Some(members) = inner.rooms.get_mut(&room) {
                if let Some(user) = members.remove(&connection) {
                    departed.push((room.clone(), user));
                }
                if members.is_empty() {
                    inner.rooms.remove(&room);
                }
            }
        }
        departed
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.read().rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
